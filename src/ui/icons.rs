//! Shared UI icons.
//!
//! Each icon falls back to plain ASCII on terminals without emoji support.

use console::Emoji;

// Status indicators
pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "[OK]");
pub static CROSS: Emoji<'_, '_> = Emoji("❌ ", "[ERR]");
pub static SPARKLE: Emoji<'_, '_> = Emoji("✨ ", "*");

// Pipeline indicators
pub static RUNNING: Emoji<'_, '_> = Emoji("▶️  ", "[>]");
pub static DECISION: Emoji<'_, '_> = Emoji("🚧 ", "[?]");
pub static RERUN: Emoji<'_, '_> = Emoji("🔄 ", "[RE]");
pub static FILE_NEW: Emoji<'_, '_> = Emoji("📄 ", "+");
pub static CLOCK: Emoji<'_, '_> = Emoji("⏱️  ", "[T]");
