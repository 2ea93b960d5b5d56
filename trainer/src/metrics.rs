use std::time::Duration;

/// Wall-clock breakdown and counters for one epoch of training.
#[derive(Debug, Default, Clone)]
pub struct EpochMetrics {
    pub sample_time: Duration,
    pub train_time: Duration,

    pub steps: u64,
    pub seeds: u64,
    pub inputs: u64,
}

impl EpochMetrics {
    #[inline]
    pub fn bump_step(&mut self) {
        self.steps += 1;
    }

    #[inline]
    pub fn add_seeds(&mut self, n: usize) {
        self.seeds += n as u64;
    }

    #[inline]
    pub fn add_inputs(&mut self, n: usize) {
        self.inputs += n as u64;
    }
}

/// Aggregate counters for a whole training run.
#[derive(Debug, Default, Clone)]
pub struct TrainMetrics {
    pub epochs: u64,
    pub steps: u64,
    pub seeds: u64,
    pub inputs: u64,
    pub sample_time: Duration,
    pub train_time: Duration,
}

impl TrainMetrics {
    /// Folds one finished epoch into the run totals.
    pub fn absorb(&mut self, epoch: &EpochMetrics) {
        self.epochs += 1;
        self.steps += epoch.steps;
        self.seeds += epoch.seeds;
        self.inputs += epoch.inputs;
        self.sample_time += epoch.sample_time;
        self.train_time += epoch.train_time;
    }
}

/// Per-step seed throughput with the first few warmup steps skipped.
#[derive(Debug, Default, Clone)]
pub struct Throughput {
    samples_per_sec: Vec<f32>,
}

impl Throughput {
    const WARMUP: usize = 3;

    pub fn record(&mut self, seeds: usize, elapsed: Duration) {
        let secs = elapsed.as_secs_f32().max(f32::EPSILON);
        self.samples_per_sec.push(seeds as f32 / secs);
    }

    /// Mean seeds/sec over everything past the warmup window.
    pub fn mean(&self) -> f32 {
        let tail = self.samples_per_sec.get(Self::WARMUP..).unwrap_or(&[]);
        if tail.is_empty() {
            return 0.0;
        }
        tail.iter().sum::<f32>() / tail.len() as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absorb_accumulates_epochs() {
        let mut totals = TrainMetrics::default();
        let mut epoch = EpochMetrics::default();
        epoch.bump_step();
        epoch.add_seeds(10);
        epoch.add_inputs(40);

        totals.absorb(&epoch);
        totals.absorb(&epoch);

        assert_eq!(totals.epochs, 2);
        assert_eq!(totals.steps, 2);
        assert_eq!(totals.seeds, 20);
        assert_eq!(totals.inputs, 80);
    }

    #[test]
    fn throughput_skips_warmup_steps() {
        let mut tput = Throughput::default();
        for _ in 0..3 {
            tput.record(1, Duration::from_secs(1));
        }
        assert_eq!(tput.mean(), 0.0);

        tput.record(10, Duration::from_secs(1));
        tput.record(20, Duration::from_secs(1));
        assert_eq!(tput.mean(), 15.0);
    }
}
