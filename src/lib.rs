//! This crate provides tools for simulating the responses of the early visual pathway (retina,
//! lateral geniculate nucleus and primary visual cortex) to visual stimuli in Rust.
//!
//! Neurons are linear firing-rate units, connected by separable spatiotemporal kernels. Responses
//! are computed in the Fourier domain, where convolutions become products and feedback loops
//! become linear systems, and brought back to space-time with FFTs.
//!
//! Units are implicit: times in ms, positions in deg, angular frequencies in rad/ms and rad/deg,
//! firing rates in spikes/s.
//!
//! # Integrator
//!
//! The [`integrator::Integrator`] holds the space-time grid (`2^nt` time steps and `2^nr x 2^nr`
//! positions) and the discrete Fourier transforms between the space-time and frequency domains.
//!
//! # Kernels
//!
//! A [`kernels::Kernel`] is the product of a [`kernels::SpatialKernel`] (delta, Gaussian or
//! difference of Gaussians) and a [`kernels::TemporalKernel`] (delta, exponential decay or
//! biphasic). Kernels describe both the receptive fields of ganglion cells and the connections.
//!
//! # Neurons
//!
//! A [`neuron::Neuron`] is either a retinal ganglion cell, a relay cell of the LGN or a cortical
//! cell. It caches its impulse response and its response to the current stimulus.
//!
//! # Creating Networks
//!
//! ```rust
//! use rusty_lgn::integrator::Integrator;
//! use rusty_lgn::kernels::{Kernel, SpatialKernel, TemporalKernel};
//! use rusty_lgn::network::Network;
//!
//! // 2^7 time steps of 1 ms and 2^4 x 2^4 positions spaced by 0.25 deg
//! let integrator = Integrator::new(7, 4, 1.0, 0.25).unwrap();
//! let mut network = Network::new(integrator);
//!
//! // A ganglion cell with a center-surround receptive field and a biphasic time course
//! let receptive_field = Kernel::new(
//!     SpatialKernel::dog(1.0, 0.62, 0.85, 1.26, 0.0, 0.0).unwrap(),
//!     TemporalKernel::biphasic(43.0, 0.38, 0.0).unwrap(),
//! );
//! let ganglion = network.create_ganglion_cell(receptive_field, 0.0).unwrap();
//! let relay = network.create_relay_cell(0.0).unwrap();
//! let cortical = network.create_cortical_cell(0.0).unwrap();
//!
//! // The thalamocortical loop
//! let feedforward = Kernel::new(
//!     SpatialKernel::gauss(1.0, 0.25, 0.0, 0.0).unwrap(),
//!     TemporalKernel::exp_decay(5.0, 2.0).unwrap(),
//! );
//! let feedback = Kernel::new(
//!     SpatialKernel::gauss(1.0, 0.83, 0.0, 0.0).unwrap(),
//!     TemporalKernel::exp_decay(10.0, 10.0).unwrap(),
//! );
//! network.connect(ganglion, relay, feedforward, 1.0).unwrap();
//! network.connect(relay, cortical, Kernel::identity(), 1.0).unwrap();
//! network.connect(cortical, relay, feedback, -0.5).unwrap();
//!
//! assert_eq!(network.num_neurons(), 3);
//! assert_eq!(network.num_connections(), 3);
//! ```
//!
//! # Stimulating Networks
//!
//! Stimuli are either descriptive (full-field and patch gratings, flashing spots), with closed-form
//! Fourier transforms, or natural (images and movies), transformed numerically.
//!
//! ```rust
//! use rusty_lgn::integrator::Integrator;
//! use rusty_lgn::kernels::{Kernel, SpatialKernel, TemporalKernel};
//! use rusty_lgn::network::Network;
//! use rusty_lgn::stimulus::Stimulus;
//!
//! let mut network = Network::new(Integrator::new(7, 4, 1.0, 0.25).unwrap());
//! let receptive_field = Kernel::new(
//!     SpatialKernel::dog(1.0, 0.62, 0.85, 1.26, 0.0, 0.0).unwrap(),
//!     TemporalKernel::biphasic(43.0, 0.38, 0.0).unwrap(),
//! );
//! let ganglion = network.create_ganglion_cell(receptive_field, 5.0).unwrap();
//!
//! network
//!     .set_stimulus(Stimulus::flashing_spot(1.0, 1.0, 10.0, 50.0).unwrap())
//!     .unwrap();
//! let response = network.compute_response(ganglion, false).unwrap();
//! assert_eq!(response.dim(), (128, 16, 16));
//!
//! // The ON-center cell fires above its background rate during the flash
//! let center = network.neuron(ganglion).unwrap().center_response().unwrap();
//! assert!(center.iter().any(|rate| *rate > 5.0));
//! ```
//!
//! # Generating Spike Trains
//!
//! Firing rates are turned into spikes by sampling inhomogeneous Poisson processes, see
//! [`spike_train::generate_spike_train`] and [`spike_train::generate_spike_trains`].
//!
//! # Running Simulations from Files
//!
//! A [`config::SimulationConfig`] gathers a network, a stimulus and the responses to report. The
//! `rusty_lgn` binary runs such configurations (`rusty_lgn run --config <file>`) and prints a
//! template with `rusty_lgn template`.

pub mod activity;
pub mod config;
pub mod connection;
pub mod error;
pub mod integrator;
pub mod kernels;
pub mod network;
pub mod neuron;
pub mod spike_train;
pub mod stimulus;
pub mod utils;
