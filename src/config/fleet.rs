use std::path::Path;

use crate::process_manager::ProcessSpec;

pub const SEQUENCER: &str = "Sequencer";
pub const CONSENSUS: &str = "Cometbft";
pub const COMPOSER: &str = "Composer";
pub const CONDUCTOR: &str = "Conductor";

/// The local stack in startup order: each process starts once the previous
/// one has been spawned. Environment is filled in by the caller.
pub fn default_fleet(instance_dir: &Path, bin_dir: &Path) -> Vec<ProcessSpec> {
    let cometbft_home = instance_dir.join(".cometbft");
    vec![
        ProcessSpec::new(SEQUENCER, bin_dir.join("astria-sequencer")),
        ProcessSpec::new(CONSENSUS, bin_dir.join("cometbft")).with_args([
            "node".to_owned(),
            "--home".to_owned(),
            cometbft_home.display().to_string(),
        ]),
        ProcessSpec::new(COMPOSER, bin_dir.join("astria-composer")),
        ProcessSpec::new(CONDUCTOR, bin_dir.join("astria-conductor")),
    ]
}
