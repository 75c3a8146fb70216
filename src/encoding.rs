//! Text encodings accepted by `read_text` / `write_text`

/// Supported text encodings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Encoding {
	#[default]
	Utf8,
	Ascii,
	/// ISO-8859-1: every byte maps to the code point of the same value
	Latin1,
}

impl Encoding {
	pub fn name(&self) -> &'static str {
		match self {
			Encoding::Utf8 => "utf-8",
			Encoding::Ascii => "ascii",
			Encoding::Latin1 => "latin-1",
		}
	}

	/// Decode bytes strictly
	pub fn decode(&self, data: Vec<u8>) -> Result<String, String> {
		match self {
			Encoding::Utf8 => String::from_utf8(data).map_err(|e| {
				format!("invalid utf-8 at byte {}", e.utf8_error().valid_up_to())
			}),
			Encoding::Ascii => match data.iter().position(|b| !b.is_ascii()) {
				Some(pos) => Err(format!("non-ascii byte 0x{:02x} at position {}", data[pos], pos)),
				// ASCII is valid UTF-8
				None => String::from_utf8(data).map_err(|e| e.to_string()),
			},
			Encoding::Latin1 => Ok(data.iter().map(|&b| b as char).collect()),
		}
	}

	/// Encode text strictly
	pub fn encode(&self, text: &str) -> Result<Vec<u8>, String> {
		match self {
			Encoding::Utf8 => Ok(text.as_bytes().to_vec()),
			Encoding::Ascii => match text.chars().position(|c| !c.is_ascii()) {
				Some(pos) => Err(format!("character at position {} is not ascii", pos)),
				None => Ok(text.as_bytes().to_vec()),
			},
			Encoding::Latin1 => text
				.chars()
				.map(|c| u8::try_from(u32::from(c)).map_err(|_| format!("{:?} is not latin-1", c)))
				.collect(),
		}
	}
}


// vim: ts=4
