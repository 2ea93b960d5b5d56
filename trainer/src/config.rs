use std::num::NonZeroUsize;

/// Shape of the synthetic partition standalone runs train on.
#[derive(Debug, Clone, Copy)]
pub struct GraphConfig {
    pub num_nodes: NonZeroUsize,
    pub avg_degree: NonZeroUsize,
    pub feature_dim: NonZeroUsize,
    pub num_classes: NonZeroUsize,
}

/// Immutable execution bounds for one trainer process.
#[derive(Debug, Clone)]
pub struct TrainerConfig {
    pub rank: usize,
    pub world_size: NonZeroUsize,
    pub epochs: NonZeroUsize,
    pub batch_size: NonZeroUsize,
    pub eval_batch_size: NonZeroUsize,
    /// Neighbors sampled per seed at each layer, innermost first.
    pub fanouts: Vec<usize>,
    pub log_every: usize,
    pub eval_every: usize,
    pub seed: Option<u64>,
    pub coordinator_addr: Option<String>,
    pub graph: GraphConfig,
}

impl TrainerConfig {
    /// Checks the invariants the training loop relies on.
    ///
    /// # Panics
    /// - if `rank` is not below `world_size`
    /// - if `fanouts` is empty or contains a zero
    /// - if `log_every` or `eval_every` is zero
    pub fn validate(&self) {
        assert!(self.rank < self.world_size.get(), "rank out of range");
        assert!(!self.fanouts.is_empty(), "fanouts must be non-empty");
        assert!(
            self.fanouts.iter().all(|f| *f > 0),
            "fanouts must be positive"
        );
        assert!(self.log_every > 0, "log_every must be > 0");
        assert!(self.eval_every > 0, "eval_every must be > 0");
    }
}

/// Loads a [`TrainerConfig`] from a JSON file.
///
/// Missing fields fall back to the usual training defaults.
///
/// # Errors
/// Returns a human-readable string if the file cannot be read or parsed.
pub fn load(path: &str) -> Result<TrainerConfig, String> {
    let content =
        std::fs::read_to_string(path).map_err(|e| format!("cannot read '{path}': {e}"))?;

    let val: serde_json::Value =
        serde_json::from_str(&content).map_err(|e| format!("invalid JSON: {e}"))?;

    parse(&val)
}

fn parse(val: &serde_json::Value) -> Result<TrainerConfig, String> {
    let nz = |key: &str, default: u64| -> Result<NonZeroUsize, String> {
        let n = val[key].as_u64().unwrap_or(default) as usize;
        NonZeroUsize::new(n).ok_or_else(|| format!("{key} must be > 0"))
    };

    let fanouts = match val["fan_out"].as_str() {
        Some(s) => s
            .split(',')
            .map(|f| {
                f.trim()
                    .parse::<usize>()
                    .map_err(|_| format!("cannot parse fanout '{f}'"))
            })
            .collect::<Result<Vec<_>, _>>()?,
        None => vec![10, 25],
    };

    if fanouts.iter().any(|f| *f == 0) {
        return Err("fanouts must be positive".into());
    }

    let graph_val = &val["graph"];
    let gnz = |key: &str, default: u64| -> Result<NonZeroUsize, String> {
        let n = graph_val[key].as_u64().unwrap_or(default) as usize;
        NonZeroUsize::new(n).ok_or_else(|| format!("graph.{key} must be > 0"))
    };

    let graph = GraphConfig {
        num_nodes: gnz("num_nodes", 1000)?,
        avg_degree: gnz("avg_degree", 10)?,
        feature_dim: gnz("feature_dim", 16)?,
        num_classes: gnz("num_classes", 8)?,
    };

    let cfg = TrainerConfig {
        rank: val["rank"].as_u64().unwrap_or(0) as usize,
        world_size: nz("world_size", 1)?,
        epochs: nz("num_epochs", 20)?,
        batch_size: nz("batch_size", 1000)?,
        eval_batch_size: nz("batch_size_eval", 100_000)?,
        fanouts,
        log_every: val["log_every"].as_u64().unwrap_or(20) as usize,
        eval_every: val["eval_every"].as_u64().unwrap_or(5) as usize,
        seed: val["seed"].as_u64(),
        coordinator_addr: val["coordinator_addr"].as_str().map(String::from),
        graph,
    };

    if cfg.rank >= cfg.world_size.get() {
        return Err(format!(
            "rank {} out of range for world_size {}",
            cfg.rank, cfg.world_size
        ));
    }
    if cfg.log_every == 0 {
        return Err("log_every must be > 0".into());
    }
    if cfg.eval_every == 0 {
        return Err("eval_every must be > 0".into());
    }

    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_defaults() {
        let val: serde_json::Value = serde_json::from_str("{}").unwrap();
        let cfg = parse(&val).unwrap();

        assert_eq!(cfg.rank, 0);
        assert_eq!(cfg.world_size.get(), 1);
        assert_eq!(cfg.epochs.get(), 20);
        assert_eq!(cfg.batch_size.get(), 1000);
        assert_eq!(cfg.fanouts, vec![10, 25]);
        assert_eq!(cfg.log_every, 20);
        assert_eq!(cfg.eval_every, 5);
        assert!(cfg.seed.is_none());
        cfg.validate();
    }

    #[test]
    fn parse_fan_out_string() {
        let val: serde_json::Value = serde_json::from_str(r#"{"fan_out": "5, 10, 15"}"#).unwrap();
        let cfg = parse(&val).unwrap();
        assert_eq!(cfg.fanouts, vec![5, 10, 15]);
    }

    #[test]
    fn parse_rejects_rank_out_of_range() {
        let val: serde_json::Value =
            serde_json::from_str(r#"{"rank": 2, "world_size": 2}"#).unwrap();
        assert!(parse(&val).is_err());
    }

    #[test]
    fn parse_rejects_zero_batch_size() {
        let val: serde_json::Value = serde_json::from_str(r#"{"batch_size": 0}"#).unwrap();
        assert!(parse(&val).is_err());
    }
}
