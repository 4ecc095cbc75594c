use std::path::PathBuf;

use rusty_lgn::config::SimulationConfig;
use rusty_lgn::error::LGNError;
use rusty_lgn::integrator::Integrator;
use rusty_lgn::stimulus::Stimulus;

fn template_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("configs/thalamocortical.json")
}

#[test]
fn test_shipped_template_matches_builtin() {
    let config = SimulationConfig::from_file(template_path()).unwrap();
    assert_eq!(config, SimulationConfig::thalamocortical().unwrap());
}

#[test]
fn test_run_shipped_template_on_coarse_grid() {
    let mut config = SimulationConfig::from_file(template_path()).unwrap();
    config.integrator = Integrator::new(8, 3, 1.0, 0.5).unwrap();
    config.report = vec![0, 1, 2];

    let report = config.run().unwrap();
    assert_eq!(report.times.len(), 256);
    assert_eq!(
        report
            .neurons
            .iter()
            .map(|neuron| neuron.kind.as_str())
            .collect::<Vec<_>>(),
        vec!["ganglion", "relay", "cortical"]
    );

    // the spot is ON: the ganglion cell is excited shortly after onset
    let ganglion = &report.neurons[0];
    let peak = ganglion
        .center_response
        .iter()
        .cloned()
        .fold(f64::NEG_INFINITY, f64::max);
    assert!(peak > 0.0);

    for neuron in report.neurons.iter() {
        let spikes = neuron.spike_times.as_ref().unwrap();
        assert!(spikes.windows(2).all(|ts| ts[0] <= ts[1]));
        assert!(spikes.iter().all(|t| (0.0..256.0).contains(t)));
    }
}

#[test]
fn test_run_requires_known_neurons() {
    let mut config = SimulationConfig::thalamocortical().unwrap();
    config.integrator = Integrator::new(4, 2, 1.0, 0.5).unwrap();
    config.report = vec![3];
    assert!(matches!(config.run(), Err(LGNError::OutOfBounds(_))));
}

#[test]
fn test_run_with_another_stimulus() {
    let mut config = SimulationConfig::thalamocortical().unwrap();
    config.integrator = Integrator::new(6, 3, 1.0, 0.5).unwrap();
    config.stimulus = Some(Stimulus::full_field_grating(0.0, 0.0, 0.0, 1.0).unwrap());
    config.seed = None;

    // a static full field yields a constant response everywhere
    let report = config.run().unwrap();
    for neuron in report.neurons.iter() {
        let first = neuron.center_response[0];
        assert!(neuron
            .center_response
            .iter()
            .all(|r| (r - first).abs() < 1e-9));
    }
}
