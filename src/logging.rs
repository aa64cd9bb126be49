//! The crate's `log` usage convention: every subsystem logs through the
//! `log` facade with a module-path target (`pmu_core::<subsystem>`), so a
//! board crate's subscriber (`env_logger` in tests, a board-specific
//! sink in production) can filter per subsystem without this crate
//! depending on any particular backend.
//!
//! Severity convention, consistent across `engine`, `actuation`, `core`,
//! `handler`:
//! - `trace!` — per-cycle bookkeeping (function evaluated, output ticked).
//!   Compiled out entirely at `release_max_level_info` in release builds,
//!   so it never costs anything on the hot path.
//! - `debug!` — state transitions that are normal and expected (soft-start
//!   completing, a retry firing).
//! - `warn!` — a recoverable fault entered (overcurrent, overtemp, a
//!   dropped event, a cycle overrun).
//! - `error!` — a terminal condition (retries exhausted, load shed).
//!
//! No log call sits on the hot per-cycle evaluation path beyond `trace!`.

/// Target string for one subsystem's log records, e.g.
/// `target_for("engine")` → `"pmu_core::engine"`. Kept as a `const fn` so
/// call sites can build `target: target_for("actuation")` without a
/// runtime allocation.
pub const fn target_for(subsystem: &'static str) -> &'static str {
    match subsystem.as_bytes() {
        b"engine" => "pmu_core::engine",
        b"actuation" => "pmu_core::actuation",
        b"core" => "pmu_core::core",
        b"handler" => "pmu_core::handler",
        b"channel" => "pmu_core::channel",
        _ => "pmu_core",
    }
}
