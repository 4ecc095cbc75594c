use ndarray::Array2;
use rustfft::num_complex::Complex64;

use rusty_lgn::activity::{raster_events, spike_activity_cube};
use rusty_lgn::integrator::Integrator;
use rusty_lgn::kernels::{Kernel, SpatialKernel, TemporalKernel};
use rusty_lgn::network::Network;
use rusty_lgn::spike_train::generate_spike_trains;
use rusty_lgn::stimulus::Stimulus;

const SEED: u64 = 42;

struct Loop {
    network: Network,
    ganglion_kernel: Kernel,
    feedforward: Kernel,
    feedback: Kernel,
    ids: (usize, usize, usize),
}

fn thalamocortical_loop(integrator: Integrator) -> Loop {
    let ganglion_kernel = Kernel::new(
        SpatialKernel::dog(1.0, 0.62, 0.85, 1.26, 0.0, 0.0).unwrap(),
        TemporalKernel::biphasic(20.0, 0.38, 0.0).unwrap(),
    );
    let feedforward = Kernel::new(
        SpatialKernel::gauss(1.0, 0.25, 0.0, 0.0).unwrap(),
        TemporalKernel::exp_decay(5.0, 2.0).unwrap(),
    );
    let feedback = Kernel::new(
        SpatialKernel::gauss(1.0, 0.83, 0.1, 0.0).unwrap(),
        TemporalKernel::exp_decay(10.0, 5.0).unwrap(),
    );

    let mut network = Network::new(integrator);
    let ganglion = network
        .create_ganglion_cell(ganglion_kernel.clone(), 0.0)
        .unwrap();
    let relay = network.create_relay_cell(2.0).unwrap();
    let cortical = network.create_cortical_cell(0.0).unwrap();
    network
        .connect(ganglion, relay, feedforward.clone(), 1.0)
        .unwrap();
    network
        .connect(relay, cortical, Kernel::identity(), 1.0)
        .unwrap();
    network
        .connect(cortical, relay, feedback.clone(), -0.5)
        .unwrap();

    Loop {
        network,
        ganglion_kernel,
        feedforward,
        feedback,
        ids: (ganglion, relay, cortical),
    }
}

#[test]
fn test_loop_response_to_drifting_grating() {
    let integrator = Integrator::new(6, 4, 1.0, 0.25).unwrap();
    let (w, kx) = (3.0 * integrator.dw(), 2.0 * integrator.dk());
    let contrast = 0.8;

    let Loop {
        mut network,
        ganglion_kernel,
        feedforward,
        feedback,
        ids: (_, relay, _),
    } = thalamocortical_loop(integrator.clone());
    network
        .set_stimulus(Stimulus::full_field_grating(w, kx, 0.0, contrast).unwrap())
        .unwrap();
    let response = network.compute_response(relay, false).unwrap().clone();

    // A grating is an eigenfunction of the network: the relay cell modulates the grating by the
    // closed-loop transfer function, on top of its background response.
    let (w, kx) = (integrator.temporal_freqs()[3], integrator.spatial_freqs()[2]);
    let transfer = feedforward.eval_ft(w, kx, 0.0) * ganglion_kernel.eval_ft(w, kx, 0.0)
        / (1.0 + 0.5 * feedback.eval_ft(w, kx, 0.0));

    let times = integrator.times();
    let positions = integrator.positions();
    for ((n, i, _), value) in response.indexed_iter() {
        let expected = 2.0
            + contrast * (Complex64::from_polar(1.0, kx * positions[i] - w * times[n]) * transfer).re;
        assert!(
            (value - expected).abs() < 1e-9,
            "at t={}, x={}: {} != {}",
            times[n],
            positions[i],
            value,
            expected
        );
    }
}

#[test]
fn test_cortical_cell_follows_relay_cell() {
    let Loop {
        mut network,
        ids: (_, relay, cortical),
        ..
    } = thalamocortical_loop(Integrator::new(6, 3, 1.0, 0.5).unwrap());
    network
        .set_stimulus(Stimulus::patch_grating(0.0, 0.0, 0.0, 2.0, 1.0).unwrap())
        .unwrap();

    let relay_response = network.compute_response(relay, false).unwrap().clone();
    let cortical_response = network.compute_response(cortical, false).unwrap();
    for (r, c) in relay_response.iter().zip(cortical_response.iter()) {
        // identity kernel, up to the background of the relay cell
        assert!((r - 2.0 - c).abs() < 1e-9);
    }
}

#[test]
fn test_changing_stimulus_keeps_impulse_responses() {
    let Loop {
        mut network,
        ids: (ganglion, _, _),
        ..
    } = thalamocortical_loop(Integrator::new(5, 3, 1.0, 0.5).unwrap());

    network
        .set_stimulus(Stimulus::flashing_spot(1.0, 1.0, 0.0, 10.0).unwrap())
        .unwrap();
    let first = network.compute_response(ganglion, false).unwrap().clone();

    network
        .set_stimulus(Stimulus::flashing_spot(-1.0, 1.0, 0.0, 10.0).unwrap())
        .unwrap();
    assert!(network.neuron(ganglion).unwrap().irf_ft().is_some());
    assert!(network.neuron(ganglion).unwrap().response().is_none());

    // linear in the contrast
    let second = network.compute_response(ganglion, false).unwrap();
    for (a, b) in first.iter().zip(second.iter()) {
        assert!((a + b).abs() < 1e-9);
    }
}

#[test]
fn test_natural_image_matches_uniform_spot() {
    // A uniform image shown for the whole window is a static full-field stimulus.
    let integrator = Integrator::new(5, 3, 1.0, 0.5).unwrap();
    let Loop {
        mut network,
        ids: (_, relay, _),
        ..
    } = thalamocortical_loop(integrator.clone());

    network
        .set_stimulus(
            Stimulus::natural_image(Array2::from_elem((8, 8), 0.5), 0.0, 32.0).unwrap(),
        )
        .unwrap();
    let image_response = network.compute_response(relay, false).unwrap().clone();

    network
        .set_stimulus(Stimulus::full_field_grating(0.0, 0.0, 0.0, 0.5).unwrap())
        .unwrap();
    let grating_response = network.compute_response(relay, false).unwrap();

    for (a, b) in image_response.iter().zip(grating_response.iter()) {
        assert!((a - b).abs() < 1e-9);
    }
}

#[test]
fn test_spike_trains_from_responses() {
    let integrator = Integrator::new(8, 3, 1.0, 0.5).unwrap();
    let Loop {
        mut network,
        ids: (_, relay, _),
        ..
    } = thalamocortical_loop(integrator.clone());
    network
        .set_stimulus(Stimulus::flashing_spot(20.0, 2.0, 10.0, 50.0).unwrap())
        .unwrap();
    let response = network.compute_response(relay, false).unwrap();

    let times = integrator.times().to_vec();
    let trains = generate_spike_trains(response, &times, SEED).unwrap();
    assert_eq!(trains.dim(), (8, 8));
    assert_eq!(generate_spike_trains(response, &times, SEED).unwrap(), trains);

    let events = raster_events(&trains);
    assert_eq!(
        events.len(),
        trains.iter().map(|train| train.len()).sum::<usize>()
    );
    assert!(events.windows(2).all(|e| e[0].0 <= e[1].0));

    let cube = spike_activity_cube(&trains, &times, 1.0).unwrap();
    assert_eq!(cube.dim(), response.dim());
    assert!(cube.iter().all(|v| *v == 0.0 || *v == 1.0));
}

#[test]
fn test_save_and_reload_gives_same_responses() {
    let Loop {
        mut network,
        ids: (_, relay, _),
        ..
    } = thalamocortical_loop(Integrator::new(5, 3, 1.0, 0.5).unwrap());
    network
        .set_stimulus(Stimulus::flashing_spot(1.0, 1.5, 2.0, 8.0).unwrap())
        .unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("loop.json");
    network.save_to(&path).unwrap();

    let expected = network.compute_response(relay, false).unwrap().clone();
    let mut loaded = Network::load_from(&path).unwrap();
    assert_eq!(loaded.compute_response(relay, false).unwrap(), &expected);
}
