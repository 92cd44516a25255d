use serde::{
    Deserialize,
    Serialize,
};

use crate::errors::{
    PeakAlignError,
    Result,
};

/// A single chromatographic peak.
///
/// `mass_spectrum` holds one intensity per mass channel, all peaks in a run
/// are expected to share the same channel layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Peak {
    /// Retention time in seconds.
    pub rt: f64,
    pub mass_spectrum: Vec<f64>,
    /// Diagnostic ion, if one was assigned upstream.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ion: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub area: Option<f64>,
}

impl Peak {
    pub fn new(rt: f64, mass_spectrum: Vec<f64>) -> Self {
        Self {
            rt,
            mass_spectrum,
            ion: None,
            area: None,
        }
    }

    pub fn with_ion(mut self, ion: u32) -> Self {
        self.ion = Some(ion);
        self
    }

    pub fn with_area(mut self, area: f64) -> Self {
        self.area = Some(area);
        self
    }

    pub fn num_channels(&self) -> usize {
        self.mass_spectrum.len()
    }

    /// Euclidean norm of the spectrum.
    pub fn spectrum_norm(&self) -> f64 {
        self.mass_spectrum.iter().map(|x| x * x).sum::<f64>().sqrt()
    }

    fn validate(&self) -> Result<()> {
        if !self.rt.is_finite() {
            return Err(PeakAlignError::invalid_input(format!(
                "retention time must be finite, got {}",
                self.rt
            )));
        }
        if self.mass_spectrum.is_empty() {
            return Err(PeakAlignError::invalid_input(format!(
                "peak at rt {} has an empty mass spectrum",
                self.rt
            )));
        }
        if let Some(bad) = self
            .mass_spectrum
            .iter()
            .find(|x| !x.is_finite() || **x < 0.0)
        {
            return Err(PeakAlignError::invalid_input(format!(
                "peak at rt {} has an invalid intensity {}",
                self.rt, bad
            )));
        }
        Ok(())
    }
}

/// One chromatography run, as handed over by whatever parsed the raw data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Experiment {
    pub expr_code: String,
    pub peaks: Vec<Peak>,
}

impl Experiment {
    pub fn new(expr_code: impl Into<String>, peaks: Vec<Peak>) -> Self {
        Self {
            expr_code: expr_code.into(),
            peaks,
        }
    }

    pub fn len(&self) -> usize {
        self.peaks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peaks.is_empty()
    }

    /// Checks the shape of a single experiment.
    ///
    /// Returns the channel count shared by all of its peaks, `None` if the
    /// experiment has no peaks.
    pub(crate) fn validate(&self) -> Result<Option<usize>> {
        if self.expr_code.is_empty() {
            return Err(PeakAlignError::invalid_input(
                "experiment code must not be empty",
            ));
        }

        let mut channels = None;
        let mut last_rt = f64::NEG_INFINITY;
        for peak in self.peaks.iter() {
            peak.validate()
                .map_err(|e| e.append_to_context(&format!("experiment '{}'", self.expr_code)))?;
            if peak.rt < last_rt {
                return Err(PeakAlignError::invalid_input(format!(
                    "peaks of experiment '{}' are not ordered by retention time ({} after {})",
                    self.expr_code, peak.rt, last_rt
                )));
            }
            last_rt = peak.rt;

            match channels {
                None => channels = Some(peak.num_channels()),
                Some(n) if n != peak.num_channels() => {
                    return Err(PeakAlignError::invalid_input(format!(
                        "experiment '{}' mixes spectra with {} and {} channels",
                        self.expr_code,
                        n,
                        peak.num_channels()
                    )));
                }
                Some(_) => {}
            }
        }
        Ok(channels)
    }
}
