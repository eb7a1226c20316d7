/// Counters kept by a [`Resampler`](crate::Resampler) over its lifetime
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResamplerStats {
    /// Source frames accepted by push
    pub frames_pushed: u64,
    /// Frames handed out by pull
    pub frames_pulled: u64,

    /// Source samples per channel accepted
    pub samples_in: u64,
    /// Target samples per channel handed out
    pub samples_out: u64,

    pub scratch_reallocations: u64,
    pub accumulation_reallocations: u64,

    /// Pushes refused because converted samples were still unread
    pub rejected_pushes: u64,
    /// Source timestamps that did not follow the previous frame
    pub discontinuities: u64,
}

impl ResamplerStats {
    /// Output samples per input sample so far
    pub fn observed_ratio(&self) -> Option<f64> {
        if self.samples_in == 0 {
            return None;
        }

        Some(self.samples_out as f64 / self.samples_in as f64)
    }

    /// Display a summary report
    pub fn report(&self) -> String {
        format!(
            "Resampler Report:
            Frames: {} in / {} out
            Samples: {} in / {} out (ratio {})
            Reallocations: {} scratch / {} accumulation
            Rejected Pushes: {}
            Discontinuities: {}",
            self.frames_pushed,
            self.frames_pulled,
            self.samples_in,
            self.samples_out,
            match self.observed_ratio() {
                Some(ratio) => format!("{:.4}", ratio),
                None => "n/a".to_string(),
            },
            self.scratch_reallocations,
            self.accumulation_reallocations,
            self.rejected_pushes,
            self.discontinuities,
        )
    }
}
