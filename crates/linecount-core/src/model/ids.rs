// ── Storage-assigned identifiers ──
//
// Thin `i64` newtypes so session, device and reading ids cannot be mixed
// up. They serialize as bare integers and bind directly as SQL values.

use std::fmt;

use rusqlite::types::{FromSql, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};

macro_rules! storage_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl $name {
            pub const fn get(self) -> i64 {
                self.0
            }

            /// Storage ids start at 1; zero and negatives never name a row.
            pub const fn is_valid(self) -> bool {
                self.0 > 0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl From<i64> for $name {
            fn from(raw: i64) -> Self {
                Self(raw)
            }
        }

        impl ToSql for $name {
            fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                self.0.to_sql()
            }
        }

        impl FromSql for $name {
            fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                i64::column_result(value).map(Self)
            }
        }
    };
}

storage_id! {
    /// Identity of a production session.
    SessionId
}

storage_id! {
    /// Internal numeric identity of a counting device.
    DeviceId
}

storage_id! {
    /// Arrival-order sequence number of a ledger entry.
    ReadingId
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn ids_serialize_as_plain_integers() {
        assert_eq!(serde_json::to_string(&SessionId(42)).unwrap(), "42");
        let id: DeviceId = serde_json::from_str("7").unwrap();
        assert_eq!(id, DeviceId(7));
    }

    #[test]
    fn non_positive_ids_are_invalid() {
        assert!(SessionId(1).is_valid());
        assert!(!SessionId(0).is_valid());
        assert!(!SessionId(-3).is_valid());
    }
}
