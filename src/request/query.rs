//! Query-parameter map that never carries empty values.

// self
use crate::_prelude::*;

/// Ordered query parameters with unique keys and non-empty values.
///
/// Inserting an empty value is a no-op, so optional parameters can be added
/// unconditionally and are simply omitted when unset.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct QueryMap(BTreeMap<String, String>);
impl QueryMap {
	/// Creates an empty map.
	pub fn new() -> Self {
		Self::default()
	}

	/// Builds the `startAt`/`endAt` millisecond range most reporting endpoints expect.
	pub fn time_range(start: OffsetDateTime, end: OffsetDateTime) -> Self {
		let mut query = Self::new();

		query.insert_millis("startAt", start);
		query.insert_millis("endAt", end);

		query
	}

	/// Sets `key` to `value` unless the value is empty.
	pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
		let value = value.into();

		if !value.is_empty() {
			self.0.insert(key.into(), value);
		}

		self
	}

	/// Sets `key` when `value` is present and renders non-empty.
	pub fn insert_opt<V>(&mut self, key: impl Into<String>, value: Option<V>) -> &mut Self
	where
		V: ToString,
	{
		if let Some(value) = value {
			self.insert(key, value.to_string());
		}

		self
	}

	/// Sets `key` to the Unix timestamp of `instant` in milliseconds.
	pub fn insert_millis(&mut self, key: impl Into<String>, instant: OffsetDateTime) -> &mut Self {
		let millis = instant.unix_timestamp_nanos() / 1_000_000;

		self.insert(key, millis.to_string())
	}

	/// Builder-style variant of [`insert`](Self::insert).
	pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
		self.insert(key, value);

		self
	}

	/// Copies every parameter of `other` into `self`, overwriting duplicates.
	pub fn extend_from(&mut self, other: &QueryMap) -> &mut Self {
		for (key, value) in other.iter() {
			self.0.insert(key.to_owned(), value.to_owned());
		}

		self
	}

	/// Returns the value stored for `key`.
	pub fn get(&self, key: &str) -> Option<&str> {
		self.0.get(key).map(String::as_str)
	}

	/// Returns `true` if `key` is set.
	pub fn contains_key(&self, key: &str) -> bool {
		self.0.contains_key(key)
	}

	/// Number of parameters.
	pub fn len(&self) -> usize {
		self.0.len()
	}

	/// Returns `true` when no parameters are set.
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	/// Iterates over parameters in key order.
	pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
		self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
	}

	/// Merges the parameters into the query string of `url`.
	///
	/// Existing pairs whose key is not in the map are kept; keys present in the map replace
	/// every existing value. The resulting query string is ordered by key.
	pub fn apply_to(&self, url: &mut Url) {
		let mut pairs = url
			.query_pairs()
			.filter(|(key, _)| !self.0.contains_key(&**key))
			.map(|(key, value)| (key.into_owned(), value.into_owned()))
			.collect::<Vec<_>>();

		pairs.extend(self.iter().map(|(k, v)| (k.to_owned(), v.to_owned())));
		pairs.sort_by(|a, b| a.0.cmp(&b.0));

		if pairs.is_empty() {
			url.set_query(None);
		} else {
			url.query_pairs_mut().clear().extend_pairs(pairs);
		}
	}
}
impl<K, V> FromIterator<(K, V)> for QueryMap
where
	K: Into<String>,
	V: Into<String>,
{
	fn from_iter<I>(iter: I) -> Self
	where
		I: IntoIterator<Item = (K, V)>,
	{
		let mut query = Self::new();

		for (key, value) in iter {
			query.insert(key, value);
		}

		query
	}
}
impl<K, V, const N: usize> From<[(K, V); N]> for QueryMap
where
	K: Into<String>,
	V: Into<String>,
{
	fn from(pairs: [(K, V); N]) -> Self {
		pairs.into_iter().collect()
	}
}
