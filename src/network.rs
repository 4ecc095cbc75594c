//! Network (with neurons and connections) structure and utilities.
//!
//! The network is linear: in the Fourier domain, the impulse responses `x` of all neurons satisfy
//! `x = d + K x` at every frequency, where `d` collects the receptive fields of the ganglion cells
//! and `K[i][j]` the weighted kernel of the connection from neuron `j` to neuron `i`. For a single
//! thalamocortical loop, this reduces to `R = K_RG G / (1 - K_RC K_CR)`.
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use derivative::Derivative;
use log::{debug, info};
use nalgebra::{DMatrix, DVector};
use ndarray::{Array3, Zip};
use rayon::prelude::*;
use rustfft::num_complex::Complex64;
use serde::{Deserialize, Serialize};

use super::connection::Connection;
use super::error::LGNError;
use super::integrator::Integrator;
use super::kernels::Kernel;
use super::neuron::{Neuron, NeuronKind};
use super::stimulus::Stimulus;

/// Represents a network of ganglion, relay and cortical cells sharing an integration grid.
#[derive(Derivative, Clone, Serialize, Deserialize)]
#[derivative(Debug, PartialEq)]
pub struct Network {
    integrator: Integrator,
    neurons: Vec<Neuron>,
    connections: Vec<Connection>,
    stimulus: Option<Stimulus>,
    #[serde(skip)]
    #[derivative(Debug = "ignore", PartialEq = "ignore")]
    stimulus_ft: Option<Array3<Complex64>>,
}

impl Network {
    /// Create an empty network on the given grid.
    pub fn new(integrator: Integrator) -> Self {
        Network {
            integrator,
            neurons: vec![],
            connections: vec![],
            stimulus: None,
            stimulus_ft: None,
        }
    }

    /// Returns the integration grid of the network.
    pub fn integrator(&self) -> &Integrator {
        &self.integrator
    }

    /// Returns a slice of neurons of the network.
    pub fn neurons(&self) -> &[Neuron] {
        &self.neurons
    }

    /// Returns a reference to a specific neuron, or `None` if not found.
    pub fn neuron(&self, id: usize) -> Option<&Neuron> {
        self.neurons.get(id)
    }

    /// Returns a slice of connections of the network.
    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    /// Returns an iterator over the connections received by a neuron.
    pub fn inputs(&self, id: usize) -> impl Iterator<Item = &Connection> + '_ {
        self.connections
            .iter()
            .filter(move |connection| connection.target_id() == id)
    }

    /// Returns the number of neurons in the network.
    pub fn num_neurons(&self) -> usize {
        self.neurons.len()
    }

    /// Returns the number of connections in the network.
    pub fn num_connections(&self) -> usize {
        self.connections.len()
    }

    /// Returns the stimulus, if any.
    pub fn stimulus(&self) -> Option<&Stimulus> {
        self.stimulus.as_ref()
    }

    /// Add a retinal ganglion cell with the given receptive field and returns its ID.
    pub fn create_ganglion_cell(
        &mut self,
        kernel: Kernel,
        background_response: f64,
    ) -> Result<usize, LGNError> {
        self.add_neuron(NeuronKind::Ganglion { kernel }, background_response)
    }

    /// Add a thalamic relay cell and returns its ID.
    pub fn create_relay_cell(&mut self, background_response: f64) -> Result<usize, LGNError> {
        self.add_neuron(NeuronKind::Relay, background_response)
    }

    /// Add a cortical cell and returns its ID.
    pub fn create_cortical_cell(&mut self, background_response: f64) -> Result<usize, LGNError> {
        self.add_neuron(NeuronKind::Cortical, background_response)
    }

    fn add_neuron(&mut self, kind: NeuronKind, background_response: f64) -> Result<usize, LGNError> {
        if !background_response.is_finite() {
            return Err(LGNError::InvalidParameter(
                "Background response must be finite".to_string(),
            ));
        }
        let id = self.neurons.len();
        debug!("New {} cell {}", kind, id);
        self.neurons.push(Neuron::new(id, kind, background_response));
        Ok(id)
    }

    /// Connect two neurons with a weighted kernel.
    ///
    /// Ganglion cells receive no input, relay cells receive input from ganglion and cortical cells,
    /// and cortical cells receive input from relay cells. Previously computed responses are dropped.
    ///
    /// # Examples
    ///
    /// ```
    /// use rusty_lgn::integrator::Integrator;
    /// use rusty_lgn::kernels::Kernel;
    /// use rusty_lgn::network::Network;
    ///
    /// let mut network = Network::new(Integrator::new(4, 4, 1.0, 0.1).unwrap());
    /// let ganglion = network.create_ganglion_cell(Kernel::identity(), 0.0).unwrap();
    /// let relay = network.create_relay_cell(0.0).unwrap();
    ///
    /// network.connect(ganglion, relay, Kernel::identity(), 1.0).unwrap();
    /// assert!(network.connect(relay, ganglion, Kernel::identity(), 1.0).is_err());
    /// assert_eq!(network.num_connections(), 1);
    /// ```
    pub fn connect(
        &mut self,
        source_id: usize,
        target_id: usize,
        kernel: Kernel,
        weight: f64,
    ) -> Result<(), LGNError> {
        let source = self.neuron(source_id).ok_or_else(|| {
            LGNError::OutOfBounds(format!("Source neuron {} not found", source_id))
        })?;
        let target = self.neuron(target_id).ok_or_else(|| {
            LGNError::OutOfBounds(format!("Target neuron {} not found", target_id))
        })?;

        check_pathway(source, target)?;

        self.connections
            .push(Connection::build(source_id, target_id, kernel, weight)?);
        self.neurons.iter_mut().for_each(|neuron| neuron.clear());
        Ok(())
    }

    /// Set the stimulus of the network and evaluate its Fourier transform.
    /// Previously computed stimulus responses are dropped.
    pub fn set_stimulus(&mut self, stimulus: Stimulus) -> Result<(), LGNError> {
        let stimulus_ft = stimulus.evaluate_ft(&self.integrator)?;
        self.stimulus = Some(stimulus);
        self.stimulus_ft = Some(stimulus_ft);
        self.neurons
            .iter_mut()
            .for_each(|neuron| neuron.clear_response());
        Ok(())
    }

    /// Drop the stimulus and all computed responses.
    pub fn clear(&mut self) {
        self.stimulus = None;
        self.stimulus_ft = None;
        self.neurons.iter_mut().for_each(|neuron| neuron.clear());
    }

    /// Compute the Fourier transform of the impulse response of every neuron.
    ///
    /// The function returns an error if the network equations are singular at some frequency,
    /// e.g., for a thalamocortical loop with unit gain.
    pub fn compute_irf_ft(&mut self) -> Result<(), LGNError> {
        let n = self.neurons.len();
        if n == 0 {
            return Ok(());
        }
        info!(
            "Computing impulse responses of {} neurons with {} connections",
            n,
            self.connections.len()
        );

        let integrator = &self.integrator;
        let (nt, nr, _) = integrator.shape();
        let w = integrator.temporal_freqs();
        let k = integrator.spatial_freqs();

        let drives: Vec<Option<Array3<Complex64>>> = self
            .neurons
            .iter()
            .map(|neuron| {
                neuron
                    .kernel()
                    .map(|kernel| integrator.evaluate_ft(|w, kx, ky| kernel.eval_ft(w, kx, ky)))
            })
            .collect();
        let couplings: Vec<Array3<Complex64>> = self
            .connections
            .iter()
            .map(|connection| integrator.evaluate_ft(|w, kx, ky| connection.eval_ft(w, kx, ky)))
            .collect();

        // Solutions are stored point by point, n values per grid point.
        let mut solutions = vec![Complex64::new(0.0, 0.0); nt * nr * nr * n];
        solutions
            .par_chunks_mut(n)
            .enumerate()
            .try_for_each(|(p, x)| {
                let index = (p / (nr * nr), (p / nr) % nr, p % nr);

                let mut a = DMatrix::<Complex64>::identity(n, n);
                for (connection, coupling) in self.connections.iter().zip(couplings.iter()) {
                    a[(connection.target_id(), connection.source_id())] -= coupling[index];
                }
                let b = DVector::<Complex64>::from_fn(n, |i, _| {
                    drives[i]
                        .as_ref()
                        .map_or(Complex64::new(0.0, 0.0), |drive| drive[index])
                });

                match a.lu().solve(&b) {
                    Some(solution)
                        if solution.iter().all(|v| v.re.is_finite() && v.im.is_finite()) =>
                    {
                        x.copy_from_slice(solution.as_slice());
                        Ok(())
                    }
                    _ => Err(LGNError::SingularSystem {
                        w: w[index.0],
                        kx: k[index.1],
                        ky: k[index.2],
                    }),
                }
            })?;

        for (i, neuron) in self.neurons.iter_mut().enumerate() {
            let irf_ft = Array3::from_shape_fn((nt, nr, nr), |(a, b, c)| {
                solutions[((a * nr + b) * nr + c) * n + i]
            });
            neuron.set_irf_ft(irf_ft);
        }
        Ok(())
    }

    /// Compute the impulse response of a neuron in space-time.
    /// The Fourier transforms of all impulse responses are (re)computed if required or missing.
    pub fn compute_irf(&mut self, id: usize, recompute_ft: bool) -> Result<&Array3<f64>, LGNError> {
        self.prepare_irf_ft(id, recompute_ft)?;
        let irf = self
            .integrator
            .compute_inverse_fft(cached_irf_ft(&self.neurons[id])?)?;
        Ok(self.neurons[id].set_irf(irf))
    }

    /// Compute the response of a neuron to the stimulus (spikes/s), including its background
    /// response. The function returns an error if no stimulus is set.
    pub fn compute_response(
        &mut self,
        id: usize,
        recompute_ft: bool,
    ) -> Result<&Array3<f64>, LGNError> {
        if self.stimulus_ft.is_none() {
            let stimulus = self.stimulus.as_ref().ok_or(LGNError::MissingStimulus)?;
            self.stimulus_ft = Some(stimulus.evaluate_ft(&self.integrator)?);
        }
        self.prepare_irf_ft(id, recompute_ft)?;

        let stimulus_ft = self.stimulus_ft.as_ref().ok_or(LGNError::MissingStimulus)?;
        let mut response_ft = cached_irf_ft(&self.neurons[id])?.clone();
        Zip::from(&mut response_ft)
            .and(stimulus_ft)
            .par_for_each(|r, s| *r *= *s);

        let background = self.neurons[id].background_response();
        let mut response = self.integrator.compute_inverse_fft(&response_ft)?;
        response.mapv_inplace(|v| v + background);
        debug!("Response of neuron {} computed", id);

        Ok(self.neurons[id].set_response(response_ft, response))
    }

    fn prepare_irf_ft(&mut self, id: usize, recompute_ft: bool) -> Result<(), LGNError> {
        let neuron = self
            .neuron(id)
            .ok_or_else(|| LGNError::OutOfBounds(format!("Neuron {} not found", id)))?;
        if recompute_ft || neuron.irf_ft().is_none() {
            self.compute_irf_ft()?;
        }
        Ok(())
    }

    /// Save the network structure (grid, neurons, connections and stimulus) as JSON.
    /// Computed responses are not saved.
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> Result<(), LGNError> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.flush()?;
        Ok(())
    }

    /// Load a network structure saved with [`Network::save_to`].
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Network, LGNError> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let network: Network = serde_json::from_reader(reader)?;
        network.validate()?;
        Ok(network)
    }

    fn validate(&self) -> Result<(), LGNError> {
        for (id, neuron) in self.neurons.iter().enumerate() {
            if neuron.id() != id {
                return Err(LGNError::OutOfBounds(format!(
                    "Neuron at position {} has ID {}",
                    id,
                    neuron.id()
                )));
            }
        }
        for connection in self.connections.iter() {
            match (
                self.neuron(connection.source_id()),
                self.neuron(connection.target_id()),
            ) {
                (Some(source), Some(target)) => check_pathway(source, target)?,
                _ => {
                    return Err(LGNError::OutOfBounds(format!(
                        "Connection {} -> {} refers to a missing neuron",
                        connection.source_id(),
                        connection.target_id()
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Ganglion cells receive no input, relay cells receive input from ganglion and cortical cells,
/// and cortical cells receive input from relay cells.
fn check_pathway(source: &Neuron, target: &Neuron) -> Result<(), LGNError> {
    match (source.kind(), target.kind()) {
        (NeuronKind::Ganglion { .. }, NeuronKind::Relay)
        | (NeuronKind::Cortical, NeuronKind::Relay)
        | (NeuronKind::Relay, NeuronKind::Cortical) => Ok(()),
        (source_kind, target_kind) => Err(LGNError::InvalidConnection(format!(
            "{} cell {} cannot project to {} cell {}",
            source_kind,
            source.id(),
            target_kind,
            target.id()
        ))),
    }
}

fn cached_irf_ft(neuron: &Neuron) -> Result<&Array3<Complex64>, LGNError> {
    neuron.irf_ft().ok_or_else(|| {
        LGNError::OutOfBounds(format!("No impulse response for neuron {}", neuron.id()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernels::{SpatialKernel, TemporalKernel};

    fn integrator() -> Integrator {
        Integrator::new(4, 4, 1.0, 0.25).unwrap()
    }

    fn ganglion_kernel() -> Kernel {
        Kernel::new(
            SpatialKernel::dog(1.0, 0.62, 0.85, 1.26, 0.0, 0.0).unwrap(),
            TemporalKernel::biphasic(5.0, 0.38, 0.0).unwrap(),
        )
    }

    #[test]
    fn test_create_cells() {
        let mut network = Network::new(integrator());
        assert_eq!(network.create_ganglion_cell(ganglion_kernel(), 0.0), Ok(0));
        assert_eq!(network.create_relay_cell(10.0), Ok(1));
        assert_eq!(network.create_cortical_cell(0.0), Ok(2));
        assert!(network.create_relay_cell(f64::NAN).is_err());

        assert_eq!(network.num_neurons(), 3);
        assert_eq!(network.neuron(1).unwrap().background_response(), 10.0);
        assert!(network.neuron(3).is_none());
    }

    #[test]
    fn test_connection_rules() {
        let mut network = Network::new(integrator());
        let ganglion = network.create_ganglion_cell(ganglion_kernel(), 0.0).unwrap();
        let relay = network.create_relay_cell(0.0).unwrap();
        let cortical = network.create_cortical_cell(0.0).unwrap();
        let kernel = Kernel::identity();

        assert!(network.connect(ganglion, relay, kernel.clone(), 1.0).is_ok());
        assert!(network.connect(relay, cortical, kernel.clone(), 1.0).is_ok());
        assert!(network.connect(cortical, relay, kernel.clone(), -0.5).is_ok());

        for (source, target) in [
            (relay, ganglion),
            (ganglion, ganglion),
            (ganglion, cortical),
            (relay, relay),
            (cortical, cortical),
        ] {
            assert!(matches!(
                network.connect(source, target, kernel.clone(), 1.0),
                Err(LGNError::InvalidConnection(_))
            ));
        }
        assert!(matches!(
            network.connect(ganglion, 7, kernel.clone(), 1.0),
            Err(LGNError::OutOfBounds(_))
        ));
        assert!(matches!(
            network.connect(ganglion, relay, kernel, f64::INFINITY),
            Err(LGNError::InvalidParameter(_))
        ));

        assert_eq!(network.num_connections(), 3);
        assert_eq!(network.inputs(relay).count(), 2);
        assert_eq!(network.inputs(ganglion).count(), 0);
    }

    #[test]
    fn test_feedforward_relay_scales_ganglion() {
        let mut network = Network::new(integrator());
        let ganglion = network.create_ganglion_cell(ganglion_kernel(), 0.0).unwrap();
        let relay = network.create_relay_cell(0.0).unwrap();
        network
            .connect(ganglion, relay, Kernel::identity(), 0.5)
            .unwrap();

        let ganglion_irf = network.compute_irf(ganglion, false).unwrap().clone();
        let relay_irf = network.compute_irf(relay, false).unwrap();
        for (g, r) in ganglion_irf.iter().zip(relay_irf.iter()) {
            assert!((0.5 * g - r).abs() < 1e-9);
        }
    }

    #[test]
    fn test_thalamocortical_loop() {
        let mut network = Network::new(integrator());
        let ganglion = network.create_ganglion_cell(ganglion_kernel(), 0.0).unwrap();
        let relay = network.create_relay_cell(0.0).unwrap();
        let cortical = network.create_cortical_cell(0.0).unwrap();

        let feedforward = Kernel::new(
            SpatialKernel::gauss(1.0, 0.1, 0.0, 0.0).unwrap(),
            TemporalKernel::delta(1.0).unwrap(),
        );
        let feedback = Kernel::new(
            SpatialKernel::gauss(1.0, 0.83, 0.0, 0.0).unwrap(),
            TemporalKernel::exp_decay(2.0, 1.0).unwrap(),
        );
        network.connect(ganglion, relay, feedforward.clone(), 1.0).unwrap();
        network.connect(relay, cortical, Kernel::identity(), 1.0).unwrap();
        network.connect(cortical, relay, feedback.clone(), -0.5).unwrap();
        network.compute_irf_ft().unwrap();

        let integrator = network.integrator().clone();
        let w = integrator.temporal_freqs();
        let k = integrator.spatial_freqs();
        let g = network.neuron(ganglion).unwrap().irf_ft().unwrap();
        let r = network.neuron(relay).unwrap().irf_ft().unwrap();
        let c = network.neuron(cortical).unwrap().irf_ft().unwrap();

        for index in [(0, 0, 0), (1, 2, 3), (7, 15, 1), (12, 4, 9)] {
            let (w, kx, ky) = (w[index.0], k[index.1], k[index.2]);
            let expected = feedforward.eval_ft(w, kx, ky) * g[index]
                / (1.0 + 0.5 * feedback.eval_ft(w, kx, ky));
            assert!((r[index] - expected).norm() < 1e-10);
            assert!((c[index] - r[index]).norm() < 1e-12);
        }
    }

    #[test]
    fn test_singular_loop() {
        let mut network = Network::new(integrator());
        let ganglion = network.create_ganglion_cell(Kernel::identity(), 0.0).unwrap();
        let relay = network.create_relay_cell(0.0).unwrap();
        let cortical = network.create_cortical_cell(0.0).unwrap();
        network.connect(ganglion, relay, Kernel::identity(), 1.0).unwrap();
        network.connect(relay, cortical, Kernel::identity(), 1.0).unwrap();
        network.connect(cortical, relay, Kernel::identity(), 1.0).unwrap();

        assert!(matches!(
            network.compute_irf_ft(),
            Err(LGNError::SingularSystem { .. })
        ));
    }

    #[test]
    fn test_response_to_static_full_field() {
        let mut network = Network::new(integrator());
        let kernel = Kernel::new(
            SpatialKernel::gauss(1.0, 0.5, 0.0, 0.0).unwrap(),
            TemporalKernel::delta(0.0).unwrap(),
        );
        let ganglion = network.create_ganglion_cell(kernel, 3.0).unwrap();

        assert_eq!(
            network.compute_response(ganglion, false),
            Err(LGNError::MissingStimulus)
        );

        network
            .set_stimulus(Stimulus::full_field_grating(0.0, 0.0, 0.0, 2.0).unwrap())
            .unwrap();
        let response = network.compute_response(ganglion, false).unwrap();
        assert!(response.iter().all(|v| (v - 5.0).abs() < 1e-9));

        let centre = network.neuron(ganglion).unwrap().center_response().unwrap();
        assert_eq!(centre.len(), 16);
        assert!(network.compute_response(5, false).is_err());
    }

    #[test]
    fn test_clear() {
        let mut network = Network::new(integrator());
        let ganglion = network.create_ganglion_cell(ganglion_kernel(), 0.0).unwrap();
        network
            .set_stimulus(Stimulus::flashing_spot(1.0, 1.0, 0.0, 5.0).unwrap())
            .unwrap();
        network.compute_response(ganglion, false).unwrap();
        assert!(network.neuron(ganglion).unwrap().response().is_some());

        network.clear();
        assert!(network.stimulus().is_none());
        assert!(network.neuron(ganglion).unwrap().irf_ft().is_none());
        assert!(network.neuron(ganglion).unwrap().response().is_none());
    }

    #[test]
    fn test_save_load() {
        let mut network = Network::new(integrator());
        let ganglion = network.create_ganglion_cell(ganglion_kernel(), 0.0).unwrap();
        let relay = network.create_relay_cell(2.0).unwrap();
        network.connect(ganglion, relay, Kernel::identity(), 0.8).unwrap();
        network
            .set_stimulus(Stimulus::flashing_spot(1.0, 1.0, 0.0, 5.0).unwrap())
            .unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("network.json");
        network.save_to(&path).unwrap();

        let mut loaded = Network::load_from(&path).unwrap();
        assert_eq!(loaded, network);
        // The stimulus transform is recomputed on demand.
        assert!(loaded.compute_response(relay, false).is_ok());

        assert!(matches!(
            Network::load_from(dir.path().join("missing.json")),
            Err(LGNError::IOError(_))
        ));
    }

    #[test]
    fn test_load_enforces_pathway() {
        let identity = r#"{"spatial":{"type":"delta","shift_x":0.0,"shift_y":0.0},"temporal":{"type":"delta","delay":0.0}}"#;
        let json = format!(
            r#"{{
                "integrator": {{"nt": 2, "nr": 2, "dt": 1.0, "dr": 0.5}},
                "neurons": [
                    {{"id": 0, "kind": {{"type": "relay"}}, "background_response": 0.0}},
                    {{"id": 1, "kind": {{"type": "relay"}}, "background_response": 0.0}}
                ],
                "connections": [
                    {{"source_id": 0, "target_id": 1, "kernel": {k}, "weight": 1.0}},
                    {{"source_id": 1, "target_id": 1, "kernel": {k}, "weight": 1.0}}
                ],
                "stimulus": null
            }}"#,
            k = identity
        );

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("relays.json");
        std::fs::write(&path, &json).unwrap();
        assert!(matches!(
            Network::load_from(&path),
            Err(LGNError::InvalidConnection(_))
        ));

        // The same file with a valid cortical target loads.
        let json = json.replacen(
            r#"{"id": 1, "kind": {"type": "relay"}"#,
            r#"{"id": 1, "kind": {"type": "cortical"}"#,
            1,
        );
        let json = json.replacen(r#""source_id": 1, "target_id": 1"#, r#""source_id": 1, "target_id": 0"#, 1);
        std::fs::write(&path, &json).unwrap();
        assert_eq!(Network::load_from(&path).unwrap().num_connections(), 2);
    }
}
