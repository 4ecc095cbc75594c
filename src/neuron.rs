//! This module provides the `Neuron` structure which composes the `Network` structure.
//!
//! Neurons are linear firing-rate units. A ganglion cell responds to the stimulus through its own
//! receptive field kernel; relay and cortical cells only see the stimulus through their inputs.
use std::fmt;

use derivative::Derivative;
use ndarray::{s, Array1, Array3};
use rustfft::num_complex::Complex64;
use serde::{Deserialize, Serialize};

use super::kernels::Kernel;

/// The population a neuron belongs to.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NeuronKind {
    /// Retinal ganglion cell, driven by the stimulus through its receptive field.
    Ganglion { kernel: Kernel },
    /// Thalamic relay cell of the LGN.
    Relay,
    /// Cortical cell, closing the thalamocortical loop.
    Cortical,
}

impl fmt::Display for NeuronKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            NeuronKind::Ganglion { .. } => write!(f, "ganglion"),
            NeuronKind::Relay => write!(f, "relay"),
            NeuronKind::Cortical => write!(f, "cortical"),
        }
    }
}

/// Represents a firing-rate neuron.
///
/// Impulse responses and responses are cached by the network; they are neither serialized nor
/// compared.
#[derive(Derivative, Clone, Serialize, Deserialize)]
#[derivative(Debug, PartialEq)]
pub struct Neuron {
    // The neuron ID.
    id: usize,
    // The population of the neuron.
    kind: NeuronKind,
    // Spontaneous firing rate (spikes/s), added to the response.
    background_response: f64,
    #[serde(skip)]
    #[derivative(Debug = "ignore", PartialEq = "ignore")]
    irf_ft: Option<Array3<Complex64>>,
    #[serde(skip)]
    #[derivative(Debug = "ignore", PartialEq = "ignore")]
    irf: Option<Array3<f64>>,
    #[serde(skip)]
    #[derivative(Debug = "ignore", PartialEq = "ignore")]
    response_ft: Option<Array3<Complex64>>,
    #[serde(skip)]
    #[derivative(Debug = "ignore", PartialEq = "ignore")]
    response: Option<Array3<f64>>,
}

impl Neuron {
    /// Create a new neuron without any computed response.
    pub fn new(id: usize, kind: NeuronKind, background_response: f64) -> Self {
        Neuron {
            id,
            kind,
            background_response,
            irf_ft: None,
            irf: None,
            response_ft: None,
            response: None,
        }
    }

    /// Returns the neuron ID.
    pub fn id(&self) -> usize {
        self.id
    }

    /// Returns the population of the neuron.
    pub fn kind(&self) -> &NeuronKind {
        &self.kind
    }

    /// Returns the spontaneous firing rate of the neuron (spikes/s).
    pub fn background_response(&self) -> f64 {
        self.background_response
    }

    /// Returns the receptive field kernel of a ganglion cell, if any.
    pub fn kernel(&self) -> Option<&Kernel> {
        match &self.kind {
            NeuronKind::Ganglion { kernel } => Some(kernel),
            _ => None,
        }
    }

    /// Returns the Fourier transform of the impulse response, if computed.
    pub fn irf_ft(&self) -> Option<&Array3<Complex64>> {
        self.irf_ft.as_ref()
    }

    /// Returns the impulse response, indexed `[t, x, y]`, if computed.
    pub fn irf(&self) -> Option<&Array3<f64>> {
        self.irf.as_ref()
    }

    /// Returns the Fourier transform of the stimulus response, if computed.
    pub fn response_ft(&self) -> Option<&Array3<Complex64>> {
        self.response_ft.as_ref()
    }

    /// Returns the stimulus response (spikes/s), indexed `[t, x, y]`, if computed.
    pub fn response(&self) -> Option<&Array3<f64>> {
        self.response.as_ref()
    }

    /// Returns the time course of the response at the centre of the visual field, if computed.
    pub fn center_response(&self) -> Option<Array1<f64>> {
        self.response.as_ref().map(|response| {
            let (_, nx, ny) = response.dim();
            response.slice(s![.., nx / 2, ny / 2]).to_owned()
        })
    }

    /// Drop all computed responses.
    pub fn clear(&mut self) {
        self.irf_ft = None;
        self.irf = None;
        self.clear_response();
    }

    /// Drop the computed stimulus responses, keeping the impulse responses.
    pub fn clear_response(&mut self) {
        self.response_ft = None;
        self.response = None;
    }

    pub(crate) fn set_irf_ft(&mut self, irf_ft: Array3<Complex64>) {
        self.irf_ft = Some(irf_ft);
        self.irf = None;
        self.clear_response();
    }

    pub(crate) fn set_irf(&mut self, irf: Array3<f64>) -> &Array3<f64> {
        self.irf.insert(irf)
    }

    pub(crate) fn set_response(
        &mut self,
        response_ft: Array3<Complex64>,
        response: Array3<f64>,
    ) -> &Array3<f64> {
        self.response_ft = Some(response_ft);
        self.response.insert(response)
    }
}
