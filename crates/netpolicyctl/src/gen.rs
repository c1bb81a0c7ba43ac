use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::Context;
use indexmap::IndexMap;

use netpolicy::{generate_state, CachedState, CapturedState, PolicySpec};

#[derive(clap::Args)]
pub(crate) struct GenArgs {
    /// Policy spec file.
    policy: PathBuf,

    /// Input file path to the current state. If not specified, STDIN is used.
    #[arg(short = 's', long)]
    current_state: Option<PathBuf>,

    /// Input file path for already resolved captured states.
    #[arg(short = 'i', long)]
    captured_states_input: Option<PathBuf>,

    /// Output file path for the emitted captured states.
    #[arg(short = 'o', long)]
    captured_states_output: Option<PathBuf>,
}

pub(crate) fn run(args: GenArgs) -> anyhow::Result<()> {
    let policy_spec = read_policy_spec(&args.policy).context("failed reading policy spec")?;
    let current_state =
        read_current_state(args.current_state.as_deref()).context("failed reading current state")?;
    let captured_states = read_captured_states(args.captured_states_input.as_deref())
        .context("failed reading captured states")?;
    log::debug!(
        "generating state from {} captures against {} bytes of current state",
        policy_spec.capture.len(),
        current_state.len()
    );

    let generated = generate_state(
        &policy_spec,
        &current_state,
        &CachedState {
            captured_states,
        },
    )
    .map_err(|err| anyhow::anyhow!("{err}"))?;

    let output = captured_states_output(args.captured_states_output)?;
    write_captured_states(&generated.cache.captured_states, &output)
        .context("failed writing captured states")?;
    log::debug!(
        "wrote {} captured states to {}",
        generated.cache.captured_states.len(),
        output.display()
    );

    print!("{}", String::from_utf8_lossy(generated.desired_state.as_bytes()));
    Ok(())
}

fn read_policy_spec(path: &Path) -> anyhow::Result<PolicySpec> {
    let marshaled = fs::read(path)?;
    Ok(serde_yaml::from_slice(&marshaled)?)
}

fn read_current_state(path: Option<&Path>) -> anyhow::Result<Vec<u8>> {
    match path {
        Some(path) => Ok(fs::read(path)?),
        None => {
            let mut buf = Vec::new();
            std::io::stdin().read_to_end(&mut buf)?;
            Ok(buf)
        }
    }
}

fn read_captured_states(path: Option<&Path>) -> anyhow::Result<IndexMap<String, CapturedState>> {
    let Some(path) = path else {
        return Ok(IndexMap::new());
    };
    let marshaled = match fs::read(path) {
        Ok(marshaled) => marshaled,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(IndexMap::new()),
        Err(err) => return Err(err.into()),
    };
    Ok(serde_yaml::from_slice(&marshaled)?)
}

fn captured_states_output(path: Option<PathBuf>) -> anyhow::Result<PathBuf> {
    match path {
        Some(path) => Ok(path),
        None => {
            let cache_dir = dirs::cache_dir().context("no cache directory available")?;
            Ok(cache_dir.join("netpolicy").join("captured-states.yaml"))
        }
    }
}

fn write_captured_states(
    captured_states: &IndexMap<String, CapturedState>,
    path: &Path,
) -> anyhow::Result<()> {
    let marshaled = if captured_states.is_empty() {
        String::new()
    } else {
        serde_yaml::to_string(captured_states)?
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, marshaled)?;
    Ok(())
}
