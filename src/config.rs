//! Module implementing simulation configurations, i.e., a network, a stimulus and the responses to
//! report, read from JSON files.
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use log::info;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use super::error::LGNError;
use super::integrator::Integrator;
use super::kernels::{Kernel, SpatialKernel, TemporalKernel};
use super::network::Network;
use super::neuron::NeuronKind;
use super::spike_train::generate_spike_train;
use super::stimulus::Stimulus;

/// A neuron of the configuration; its ID is its position in the list.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct NeuronConfig {
    pub kind: NeuronKind,
    #[serde(default)]
    pub background_response: f64,
}

/// A connection of the configuration, the identity kernel being the default.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    pub source: usize,
    pub target: usize,
    #[serde(default)]
    pub kernel: Kernel,
    pub weight: f64,
}

/// Represents a complete simulation.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    pub integrator: Integrator,
    pub neurons: Vec<NeuronConfig>,
    #[serde(default)]
    pub connections: Vec<ConnectionConfig>,
    #[serde(default)]
    pub stimulus: Option<Stimulus>,
    /// IDs of the neurons to report, all neurons if empty.
    #[serde(default)]
    pub report: Vec<usize>,
    /// Seed of the spike trains; no spike trains are generated if missing.
    #[serde(default)]
    pub seed: Option<u64>,
}

/// The response of a neuron at the centre of the visual field.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct NeuronReport {
    pub id: usize,
    pub kind: String,
    /// Firing rate (spikes/s) at each time of the grid.
    pub center_response: Vec<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spike_times: Option<Vec<f64>>,
}

/// Represents the outcome of a simulation.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct SimulationReport {
    pub times: Vec<f64>,
    pub neurons: Vec<NeuronReport>,
}

impl SimulationConfig {
    /// Read a configuration from a JSON file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, LGNError> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let config = serde_json::from_reader(reader)?;
        Ok(config)
    }

    /// A ganglion cell feeding a relay cell, itself in a loop with a cortical cell, driven by a
    /// flashing spot.
    pub fn thalamocortical() -> Result<Self, LGNError> {
        let ganglion = Kernel::new(
            SpatialKernel::dog_default(0.0, 0.0),
            TemporalKernel::biphasic_default(0.0)?,
        );
        let feedforward = Kernel::new(
            SpatialKernel::gauss(1.0, 0.25, 0.0, 0.0)?,
            TemporalKernel::exp_decay(5.0, 2.0)?,
        );
        let feedback = Kernel::new(
            SpatialKernel::gauss(1.0, 0.83, 0.0, 0.0)?,
            TemporalKernel::exp_decay(10.0, 10.0)?,
        );

        Ok(SimulationConfig {
            integrator: Integrator::new(8, 5, 1.0, 0.2)?,
            neurons: vec![
                NeuronConfig {
                    kind: NeuronKind::Ganglion { kernel: ganglion },
                    background_response: 0.0,
                },
                NeuronConfig {
                    kind: NeuronKind::Relay,
                    background_response: 0.0,
                },
                NeuronConfig {
                    kind: NeuronKind::Cortical,
                    background_response: 0.0,
                },
            ],
            connections: vec![
                ConnectionConfig {
                    source: 0,
                    target: 1,
                    kernel: feedforward,
                    weight: 1.0,
                },
                ConnectionConfig {
                    source: 1,
                    target: 2,
                    kernel: Kernel::identity(),
                    weight: 1.0,
                },
                ConnectionConfig {
                    source: 2,
                    target: 1,
                    kernel: feedback,
                    weight: -0.5,
                },
            ],
            stimulus: Some(Stimulus::flashing_spot(1.0, 1.0, 10.0, 100.0)?),
            report: vec![],
            seed: Some(42),
        })
    }

    /// Build the network described by the configuration, with its stimulus if any.
    pub fn build_network(&self) -> Result<Network, LGNError> {
        let mut network = Network::new(self.integrator.clone());
        for neuron in self.neurons.iter() {
            match &neuron.kind {
                NeuronKind::Ganglion { kernel } => {
                    network.create_ganglion_cell(kernel.clone(), neuron.background_response)?
                }
                NeuronKind::Relay => network.create_relay_cell(neuron.background_response)?,
                NeuronKind::Cortical => network.create_cortical_cell(neuron.background_response)?,
            };
        }
        for connection in self.connections.iter() {
            network.connect(
                connection.source,
                connection.target,
                connection.kernel.clone(),
                connection.weight,
            )?;
        }
        if let Some(stimulus) = &self.stimulus {
            network.set_stimulus(stimulus.clone())?;
        }
        Ok(network)
    }

    /// Run the simulation and report the centre responses of the requested neurons,
    /// with a spike train for each of them if a seed is given.
    pub fn run(&self) -> Result<SimulationReport, LGNError> {
        let mut network = self.build_network()?;
        let ids: Vec<usize> = if self.report.is_empty() {
            (0..network.num_neurons()).collect()
        } else {
            self.report.clone()
        };
        info!(
            "Simulating {} neurons on a {:?} grid",
            network.num_neurons(),
            network.integrator().shape()
        );

        let times = network.integrator().times().to_vec();
        let mut neurons = Vec::with_capacity(ids.len());
        for id in ids {
            network.compute_response(id, false)?;
            let neuron = network
                .neuron(id)
                .ok_or_else(|| LGNError::OutOfBounds(format!("Neuron {} not found", id)))?;
            let center_response = neuron
                .center_response()
                .ok_or(LGNError::MissingStimulus)?
                .to_vec();

            let spike_times = self
                .seed
                .map(|seed| {
                    let mut rng = ChaCha8Rng::seed_from_u64(seed);
                    rng.set_stream(id as u64);
                    generate_spike_train(&center_response, &times, &mut rng)
                })
                .transpose()?;

            neurons.push(NeuronReport {
                id,
                kind: neuron.kind().to_string(),
                center_response,
                spike_times,
            });
        }

        Ok(SimulationReport { times, neurons })
    }
}

impl SimulationReport {
    /// Save the report as JSON.
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> Result<(), LGNError> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.flush()?;
        Ok(())
    }
}
