/// Session identifier as it appears in the session and purchase logs.
/// Example: `3`, `4440001`
pub type SessionId = i64;
/// Item identifier shared by the session, purchase, and metadata logs.
/// Example: `9655`, `15654`
pub type ItemId = i64;
/// Metadata category identifier.
/// Example: `56`
pub type CategoryId = i64;
/// Metadata value identifier within a category.
/// Example: `365`
pub type ValueId = i64;
/// UTC milliseconds since the Unix epoch.
/// Example: `1608326700373` (`2020-12-18 21:25:00.373`)
pub type TimestampMs = i64;
/// Time bucket index relative to the pipeline epoch.
/// Example: `0` for January 2020, `-1` for December 2019
pub type WindowKey = i64;
/// Position of a field in an encoded training line.
/// Example: `0` for the session distinct-item count
pub type FieldIndex = u32;
/// Serialized training line.
/// Example: `1 qid:3 0:2 1:0.25 2:4`
pub type EncodedLine = String;
/// Human-readable name of an input source used in errors and logs.
/// Examples: `sessions`, `purchases`, `item_features`
pub type SourceName = String;
