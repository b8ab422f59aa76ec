//! Output helpers for consistent CLI output.
//!
//! Status messages go to stderr so that stdout carries only the rendered
//! artifact and can be piped straight into a file or `bash`.
//!
//! # Example
//!
//! ```rust,ignore
//! use firstboot::output::Output;
//!
//! Output::success("Wrote /var/lib/firstboot/run.sh");
//! Output::kv("Flags", "photon photon3");
//! ```

use owo_colors::OwoColorize;

/// Standard output helper for consistent CLI formatting.
pub struct Output;

impl Output {
    /// Print a success message with a green checkmark.
    ///
    /// Example: `✓ Wrote run.sh`
    pub fn success(msg: impl AsRef<str>) {
        eprintln!("{} {}", "✓".green().bold(), msg.as_ref());
    }

    /// Print a header/section title.
    pub fn header(msg: impl AsRef<str>) {
        eprintln!("\n{}\n", msg.as_ref().bold().cyan());
    }

    /// Print a key-value pair with alignment.
    ///
    /// Example: `  Platform:      photon`
    pub fn kv(key: impl AsRef<str>, value: impl AsRef<str>) {
        eprintln!("  {:<14} {}", format!("{}:", key.as_ref()).cyan(), value.as_ref());
    }
}
