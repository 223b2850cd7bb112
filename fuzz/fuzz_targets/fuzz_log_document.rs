// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

#![no_main]

use libfuzzer_sys::fuzz_target;
use snapsolve::answer_log::{chronological, AnswerLogDocument};

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    // Once normalised, reversing twice is the identity and the entry count is stable
    let normalised = AnswerLogDocument::parse(text).render();
    assert_eq!(chronological(&chronological(&normalised)), normalised);
    assert_eq!(
        AnswerLogDocument::parse(&normalised).len(),
        AnswerLogDocument::parse(&chronological(&normalised)).len()
    );
});
