use crate::err::{GoldenError, HandleError};
use crate::expectation::ExpectedRecord;
use crate::golden::sync_golden;
use crate::matcher::{MatchState, Matcher};
use crate::metafile::{MetafileFactory, MetafileHandle};
use crate::playback::{Overrides, Player, RecordExecutor};
use crate::record_stream::walk;
use crate::settings::CheckSettings;

use log::{debug, info};

fn log_outcome(what: &str, settings: &CheckSettings, state: &MatchState) {
    if state.is_ok() {
        debug!(
            "{} {}: {} records matched",
            what,
            settings.get_description(),
            state.position
        );
    } else {
        info!(
            "{} {}: {} discrepancies over {} records",
            what,
            settings.get_description(),
            state.discrepancies.len(),
            state.position
        );
    }
}

/// Matches the logical stream of `data` against `expected`.
pub fn verify_bytes(
    data: &[u8],
    expected: &[ExpectedRecord],
    settings: &CheckSettings,
) -> MatchState {
    let mut matcher = Matcher::new(expected);
    walk(data, settings, &mut matcher);

    let state = matcher.finish();
    log_outcome("verify", settings, &state);
    state
}

/// Matches the logical stream of a metafile against `expected`.
///
/// Every discrepancy is collected; the walk never stops early.
pub fn verify<H: MetafileHandle + ?Sized>(
    handle: &H,
    expected: &[ExpectedRecord],
    settings: &CheckSettings,
) -> Result<MatchState, HandleError> {
    let data = handle.raw_bytes()?;
    Ok(verify_bytes(&data, expected, settings))
}

/// Like [`verify`], after applying the golden mode of `settings`.
///
/// The golden file is named after `settings.get_description()`.
pub fn verify_golden<F: MetafileFactory>(
    handle: &F::Handle,
    factory: &F,
    expected: &[ExpectedRecord],
    settings: &CheckSettings,
) -> Result<MatchState, GoldenError> {
    let handle = sync_golden(handle, factory, settings.get_description(), settings)?;
    Ok(verify(handle.get(), expected, settings)?)
}

/// Replays a metafile through `executor`, matching it against `expected` at the same time.
///
/// Records with a registered override are handed to it instead of the executor, provided they
/// matched their expectation entry. Playback halts at the first unexpected record or executor
/// failure. Embedded metafiles are never descended into: they are played by the record that
/// draws them.
pub fn replay<H, E>(
    handle: &H,
    executor: &mut E,
    expected: &[ExpectedRecord],
    overrides: &mut Overrides<'_>,
    settings: &CheckSettings,
) -> Result<MatchState, HandleError>
where
    H: MetafileHandle + ?Sized,
    E: RecordExecutor,
{
    let data = handle.raw_bytes()?;
    let settings = settings.clone().descend_embedded(false);

    let mut player = Player::new(Matcher::new(expected), executor, overrides);
    walk(&data, &settings, &mut player);

    let state = player.into_matcher().finish();
    log_outcome("replay", &settings, &state);
    Ok(state)
}
