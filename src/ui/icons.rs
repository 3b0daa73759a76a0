//! Shared UI icons and emojis.
//!
//! Common emoji constants with plain-text fallbacks for terminals without
//! emoji support.

use console::Emoji;

// Step outcomes
pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "[OK]");
pub static CROSS: Emoji<'_, '_> = Emoji("❌ ", "[ERR]");
pub static SATISFIED: Emoji<'_, '_> = Emoji("⏭️  ", "[=]");
pub static SKIPPED: Emoji<'_, '_> = Emoji("⏸️  ", "[SKIP]");
pub static PENDING: Emoji<'_, '_> = Emoji("▫️ ", "[ ]");

// Run phases
pub static PLAN: Emoji<'_, '_> = Emoji("🗺️  ", "[PLAN]");
pub static RUN: Emoji<'_, '_> = Emoji("▶️  ", "[RUN]");
pub static REPORT: Emoji<'_, '_> = Emoji("📋 ", "[REPORT]");
