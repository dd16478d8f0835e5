//! Text helpers shared by feed parsing and message composition.
//!
//! - **Entity decoding**: feed text arrives HTML-escaped on top of XML escaping
//! - **Line wrapping**: Unicode-aware wrapping for plain-text abstracts
//!
//! # Examples
//!
//! ```
//! use talkbot::util::{decode_entities, wrap_text, LINE_WIDTH};
//!
//! assert_eq!(decode_entities("Erd&#337;s"), "Erdős");
//! assert_eq!(wrap_text("fits on one line", LINE_WIDTH), "fits on one line");
//! ```

mod text;

pub use text::{decode_entities, display_width, wrap_text, LINE_WIDTH};
