/// Byte-size estimation for cached values
///
/// The cache enforces its byte budget against estimated sizes, so value
/// types supply their own estimate instead of the cache guessing from a
/// type switch. Estimates do not need to be exact; they need to be
/// consistent so the budget stays meaningful.

pub trait EstimateSize {
    /// Estimated in-memory size of this value in bytes
    fn estimate_size(&self) -> u64;
}

impl EstimateSize for String {
    fn estimate_size(&self) -> u64 {
        self.len() as u64
    }
}

impl EstimateSize for Vec<u8> {
    fn estimate_size(&self) -> u64 {
        self.len() as u64
    }
}

macro_rules! scalar_estimate {
    ($($ty:ty),*) => {
        $(
            impl EstimateSize for $ty {
                fn estimate_size(&self) -> u64 {
                    8
                }
            }
        )*
    };
}

scalar_estimate!(i32, i64, u32, u64, f32, f64, bool);

/// Recursive estimate over dynamic JSON values: strings count their
/// bytes, scalars count 8, containers sum their children plus the key
/// lengths of object entries.
impl EstimateSize for serde_json::Value {
    fn estimate_size(&self) -> u64 {
        match self {
            serde_json::Value::Null => 0,
            serde_json::Value::Bool(_) | serde_json::Value::Number(_) => 8,
            serde_json::Value::String(s) => s.len() as u64,
            serde_json::Value::Array(items) => items.iter().map(|v| v.estimate_size()).sum(),
            serde_json::Value::Object(map) => map
                .iter()
                .map(|(k, v)| k.len() as u64 + v.estimate_size())
                .sum(),
        }
    }
}

impl<T: EstimateSize> EstimateSize for std::sync::Arc<T> {
    fn estimate_size(&self) -> u64 {
        self.as_ref().estimate_size()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn strings_and_bytes_count_their_length() {
        assert_eq!("hello".to_string().estimate_size(), 5);
        assert_eq!(vec![0u8; 100].estimate_size(), 100);
    }

    #[test]
    fn scalars_are_fixed_size() {
        assert_eq!(42i64.estimate_size(), 8);
        assert_eq!(1.5f64.estimate_size(), 8);
        assert_eq!(true.estimate_size(), 8);
    }

    #[test]
    fn json_values_sum_recursively() {
        let value = json!({
            "ab": "xyz",      // 2 (key) + 3 (string)
            "n": 1,           // 1 (key) + 8 (number)
            "list": [1, 2],   // 4 (key) + 16 (numbers)
        });
        assert_eq!(value.estimate_size(), 2 + 3 + 1 + 8 + 4 + 16);
    }

    #[test]
    fn null_is_free() {
        assert_eq!(serde_json::Value::Null.estimate_size(), 0);
    }
}
