#![allow(dead_code)]

use proptest::prelude::*;

/// Strategy for carrier codes
pub fn carrier_strategy() -> impl Strategy<Value = String> {
    "[A-Z]{3,5}[0-9]{0,2}"
}

/// Sequences of successful row counts for a chunked step
pub fn chunk_sequence_strategy() -> impl Strategy<Value = Vec<u64>> {
    prop::collection::vec(0u64..1500, 0..12)
}

/// Command results where roughly one in six is a database fault
pub fn faulty_sequence_strategy() -> impl Strategy<Value = Vec<Result<u64, String>>> {
    prop::collection::vec(
        prop_oneof![
            5 => (0u64..50).prop_map(Ok),
            1 => "[a-z]{3,12}".prop_map(Err),
        ],
        1..20,
    )
}
