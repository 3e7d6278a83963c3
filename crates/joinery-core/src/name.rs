// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Hierarchical names.
//!
//! A [`Name`] is a sequence of [`Component`]s written in URI form as
//! `/edu/ucla/alice/KEY/%8A%01/NDNCERT/v=1700000000000`. Generic components
//! hold arbitrary bytes; bytes outside the unreserved set are
//! percent-encoded. Two typed components carry certificate bookkeeping:
//! versions (`v=<n>`) and implicit SHA-256 digests (`sha256digest=<hex>`).

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

const VERSION_PREFIX: &str = "v=";
const DIGEST_PREFIX: &str = "sha256digest=";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NameError {
	#[error("name must start with '/': {0}")]
	MissingLeadingSlash(String),

	#[error("invalid percent-encoding in component: {0}")]
	InvalidEscape(String),

	#[error("invalid version component: {0}")]
	InvalidVersion(String),

	#[error("invalid digest component: {0}")]
	InvalidDigest(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Component {
	Generic(Vec<u8>),
	Version(u64),
	ImplicitDigest([u8; 32]),
}

impl Component {
	pub fn generic(value: impl AsRef<[u8]>) -> Self {
		Self::Generic(value.as_ref().to_vec())
	}

	/// Human-readable value. Generic components decode as (lossy) UTF-8,
	/// typed components use their URI form.
	pub fn text(&self) -> String {
		match self {
			Self::Generic(bytes) => String::from_utf8_lossy(bytes).into_owned(),
			other => other.to_string(),
		}
	}

	pub fn as_version(&self) -> Option<u64> {
		match self {
			Self::Version(v) => Some(*v),
			_ => None,
		}
	}

	fn parse(s: &str) -> Result<Self, NameError> {
		if let Some(rest) = s.strip_prefix(VERSION_PREFIX) {
			let v = rest
				.parse::<u64>()
				.map_err(|_| NameError::InvalidVersion(s.to_string()))?;
			return Ok(Self::Version(v));
		}

		if let Some(rest) = s.strip_prefix(DIGEST_PREFIX) {
			let bytes = hex::decode(rest).map_err(|_| NameError::InvalidDigest(s.to_string()))?;
			let digest: [u8; 32] = bytes
				.try_into()
				.map_err(|_| NameError::InvalidDigest(s.to_string()))?;
			return Ok(Self::ImplicitDigest(digest));
		}

		// "..." is the empty component; more dots escape a dots-only value.
		if s.len() >= 3 && s.bytes().all(|b| b == b'.') {
			return Ok(Self::Generic(vec![b'.'; s.len() - 3]));
		}

		percent_decode(s).map(Self::Generic)
	}
}

impl From<&str> for Component {
	fn from(value: &str) -> Self {
		Self::generic(value)
	}
}

impl From<String> for Component {
	fn from(value: String) -> Self {
		Self::Generic(value.into_bytes())
	}
}

impl fmt::Display for Component {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Version(v) => write!(f, "{VERSION_PREFIX}{v}"),
			Self::ImplicitDigest(d) => write!(f, "{DIGEST_PREFIX}{}", hex::encode(d)),
			Self::Generic(bytes) if bytes.iter().all(|b| *b == b'.') => {
				write!(f, "...{}", ".".repeat(bytes.len()))
			}
			Self::Generic(bytes) => {
				for b in bytes {
					if is_unreserved(*b) {
						write!(f, "{}", *b as char)?;
					} else {
						write!(f, "%{b:02X}")?;
					}
				}
				Ok(())
			}
		}
	}
}

fn is_unreserved(b: u8) -> bool {
	b.is_ascii_alphanumeric() || matches!(b, b'-' | b'.' | b'_' | b'~')
}

fn percent_decode(s: &str) -> Result<Vec<u8>, NameError> {
	let bytes = s.as_bytes();
	let mut out = Vec::with_capacity(bytes.len());
	let mut i = 0;
	while i < bytes.len() {
		if bytes[i] == b'%' {
			let hex_pair = s
				.get(i + 1..i + 3)
				.ok_or_else(|| NameError::InvalidEscape(s.to_string()))?;
			let b = u8::from_str_radix(hex_pair, 16)
				.map_err(|_| NameError::InvalidEscape(s.to_string()))?;
			out.push(b);
			i += 3;
		} else {
			out.push(bytes[i]);
			i += 1;
		}
	}
	Ok(out)
}

#[derive(Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Name {
	components: Vec<Component>,
}

impl Name {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn from_components(components: Vec<Component>) -> Self {
		Self { components }
	}

	pub fn parse(s: &str) -> Result<Self, NameError> {
		let s = s.strip_prefix("ndn:").unwrap_or(s);
		let body = s
			.strip_prefix('/')
			.ok_or_else(|| NameError::MissingLeadingSlash(s.to_string()))?;

		let components = body
			.split('/')
			.filter(|c| !c.is_empty())
			.map(Component::parse)
			.collect::<Result<Vec<_>, _>>()?;

		Ok(Self { components })
	}

	pub fn len(&self) -> usize {
		self.components.len()
	}

	pub fn is_empty(&self) -> bool {
		self.components.is_empty()
	}

	pub fn components(&self) -> &[Component] {
		&self.components
	}

	/// Component at `index`; negative indexes count from the end.
	pub fn get(&self, index: isize) -> Option<&Component> {
		let idx = if index < 0 {
			self.len().checked_sub(index.unsigned_abs())?
		} else {
			index as usize
		};
		self.components.get(idx)
	}

	/// First `n` components; a negative `n` drops `|n|` trailing components.
	/// Out-of-range values saturate to the empty or the full name.
	pub fn prefix(&self, n: isize) -> Name {
		let len = if n < 0 {
			self.len().saturating_sub(n.unsigned_abs())
		} else {
			(n as usize).min(self.len())
		};
		Self {
			components: self.components[..len].to_vec(),
		}
	}

	pub fn append(mut self, component: impl Into<Component>) -> Name {
		self.components.push(component.into());
		self
	}

	pub fn push(&mut self, component: impl Into<Component>) {
		self.components.push(component.into());
	}

	pub fn is_prefix_of(&self, other: &Name) -> bool {
		self.len() <= other.len() && other.components[..self.len()] == self.components[..]
	}
}

impl fmt::Display for Name {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		if self.components.is_empty() {
			return f.write_str("/");
		}
		for c in &self.components {
			write!(f, "/{c}")?;
		}
		Ok(())
	}
}

impl fmt::Debug for Name {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_tuple("Name").field(&self.to_string()).finish()
	}
}

impl FromStr for Name {
	type Err = NameError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::parse(s)
	}
}

impl Serialize for Name {
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		serializer.collect_str(self)
	}
}

impl<'de> Deserialize<'de> for Name {
	fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
	where
		D: Deserializer<'de>,
	{
		let s = String::deserialize(deserializer)?;
		Self::parse(&s).map_err(serde::de::Error::custom)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;

	#[test]
	fn parse_testbed_certificate_name() {
		let name = Name::parse("/ndn/edu/ucla/alice/KEY/%8A%01/NDNCERT/v=1700000000000").unwrap();
		assert_eq!(name.len(), 8);
		assert_eq!(name.get(3).unwrap().text(), "alice");
		assert_eq!(name.get(-5).unwrap().text(), "alice");
		assert_eq!(name.get(5), Some(&Component::Generic(vec![0x8a, 0x01])));
		assert_eq!(name.get(-1).unwrap().as_version(), Some(1_700_000_000_000));
	}

	#[test]
	fn negative_index_out_of_range() {
		let name = Name::parse("/a/b").unwrap();
		assert!(name.get(-3).is_none());
		assert!(name.get(2).is_none());
	}

	#[test]
	fn prefix_drops_trailing_components() {
		let name = Name::parse("/ws/demo/KEY/k1/self/v=1").unwrap();
		assert_eq!(name.prefix(-4).to_string(), "/ws/demo");
		assert_eq!(name.prefix(2).to_string(), "/ws/demo");
		assert_eq!(name.prefix(-10), Name::new());
		assert_eq!(name.prefix(99), name);
	}

	#[test]
	fn append_and_prefix_relation() {
		let base = Name::parse("/ws/demo").unwrap();
		let child = base.clone().append("alice-7");
		assert!(base.is_prefix_of(&child));
		assert!(!child.is_prefix_of(&base));
		assert_eq!(child.to_string(), "/ws/demo/alice-7");
	}

	#[test]
	fn typed_components_display() {
		let digest = [0xabu8; 32];
		let name = Name::new()
			.append("x")
			.append(Component::Version(3))
			.append(Component::ImplicitDigest(digest));
		let s = name.to_string();
		assert!(s.starts_with("/x/v=3/sha256digest=abab"));
		assert_eq!(Name::parse(&s).unwrap(), name);
	}

	#[test]
	fn empty_component_uses_dots() {
		let name = Name::new().append(Component::Generic(vec![]));
		assert_eq!(name.to_string(), "/...");
		assert_eq!(Name::parse("/...").unwrap(), name);
	}

	#[test]
	fn rejects_relative_names() {
		assert!(matches!(
			Name::parse("a/b"),
			Err(NameError::MissingLeadingSlash(_))
		));
	}

	#[test]
	fn rejects_bad_escape() {
		assert!(matches!(
			Name::parse("/a%G1"),
			Err(NameError::InvalidEscape(_))
		));
		assert!(matches!(Name::parse("/a%4"), Err(NameError::InvalidEscape(_))));
	}

	#[test]
	fn serde_uses_uri_form() {
		let name = Name::parse("/ws/demo/a%20b").unwrap();
		let json = serde_json::to_string(&name).unwrap();
		assert_eq!(json, "\"/ws/demo/a%20b\"");
	}

	proptest! {
		#[test]
		fn uri_form_reparses(parts in prop::collection::vec(prop::collection::vec(any::<u8>(), 0..12), 0..6)) {
			let name = Name::from_components(parts.into_iter().map(Component::Generic).collect());
			let reparsed = Name::parse(&name.to_string()).unwrap();
			prop_assert_eq!(reparsed, name);
		}
	}
}
