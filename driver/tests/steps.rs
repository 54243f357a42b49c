use itertools::Itertools;
use pic_driver::config::{Config, FieldConfig, GridConfig, SpeciesConfig};
use pic_driver::{run, Simulation};
use pic_kinetics::pipeline::{Dispatch, OverflowPolicy, PipelineConfig};

fn config(dispatch: Dispatch) -> Config {
    Config {
        steps: 5,
        seed: 3,
        n_particles: 2000,
        mover_fraction: 1.,
        u_thermal: 0.4,
        grid: GridConfig {
            cells: [6, 5, 4],
            spacing: [1., 1., 1.],
            dt: 0.5,
            cvac: 1.,
        },
        species: SpeciesConfig {
            name: "electron".into(),
            q: -1.,
            m: 1.,
        },
        fields: FieldConfig {
            e: [0.; 3],
            cb: [0., 0., 0.5],
        },
        pipeline: PipelineConfig {
            n_pipeline: 3,
            dispatch,
            overflow: OverflowPolicy::FailFast,
        },
    }
}

#[test]
fn test_particles_stay_sorted_and_interior() {
    let config = config(Dispatch::Threads);
    let mut simulation = Simulation::new(&config).unwrap();
    let grid = simulation.species.grid().clone();

    for _ in 0..config.steps {
        let summary = simulation.step().unwrap();
        assert_eq!(0, summary.n_ignored);
        assert!(summary.hops >= summary.nm);

        let sp = &simulation.species;
        assert_eq!(config.n_particles, sp.np());
        assert_eq!(0, sp.nm());
        assert!(sp.particles().iter().tuple_windows().all(|(a, b)| a.i <= b.i));
        for p in sp.particles() {
            assert!(grid.is_interior(p.i));
            assert!(p.position().iter().all(|x| x.abs() <= 1.));
        }
        assert!(sp.cell_offsets().is_some());
    }
}

#[test]
fn test_magnetic_field_does_no_work() {
    let config = config(Dispatch::Rayon);
    let mut simulation = Simulation::new(&config).unwrap();
    let before = simulation.species.kinetic_energy();

    for _ in 0..config.steps {
        simulation.step().unwrap();
    }

    let after = simulation.species.kinetic_energy();
    assert!(((after - before) / before).abs() < 1e-4);
}

#[test]
fn test_dispatchers_agree() {
    let summaries = [Dispatch::Serial, Dispatch::Rayon, Dispatch::Threads]
        .map(|dispatch| run(&config(dispatch)).unwrap());
    assert_eq!(summaries[0], summaries[1]);
    assert_eq!(summaries[0], summaries[2]);
}

#[test]
fn test_small_mover_storage_fails_fast() {
    let mut config = config(Dispatch::Serial);
    config.mover_fraction = 0.001;
    assert!(run(&config).is_err());

    config.pipeline.overflow = OverflowPolicy::Degrade;
    let summaries = run(&config).unwrap();
    assert!(summaries.iter().any(|s| s.n_ignored > 0));
}
