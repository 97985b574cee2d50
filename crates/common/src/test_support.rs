/// Key fixtures shared with integration tests and dependent crates.
#[cfg(any(test, feature = "test-fixtures"))]
pub mod fixtures {
    /// Private key behind [`FIXTURE_ENCRYPTED_KEY`].
    pub const FIXTURE_PRIVATE_KEY_HEX: &str =
        "2b9d29d68936ab0219d6ba6d19529311eb5cb3a6df998745d7123fd6cc9c6456";
    pub const FIXTURE_PASSWORD: &str = "secret";
    /// [`FIXTURE_PRIVATE_KEY_HEX`] encrypted under [`FIXTURE_PASSWORD`].
    pub const FIXTURE_ENCRYPTED_KEY: &str =
        "2NbMhAKM2k1cQh75DqubeQX4RSkWNHpL8K9T89mMufnFWZ6XtzYm71FfGdi1zkHZtW3aUAPFJpYkwvBA2AXmJUDm6swLUk7yqCzzo8JG9k2eyB";
    /// [`FIXTURE_PRIVATE_KEY_HEX`] encrypted under the empty password.
    pub const FIXTURE_ENCRYPTED_KEY_EMPTY_PASSWORD: &str =
        "3hzJA3crZTmXNBGdwTYFyWXYQ3BFxzv2RqeXVDkRaLfFLB9bQbbYpUmLsiUsv7HPuEY6QNJgJewq8pTqaYxGNhvGPcdJ8ht4mcb1L1G7c9GgCr";
    /// Compressed public key of [`FIXTURE_PRIVATE_KEY_HEX`].
    pub const FIXTURE_IDENTITY: &str =
        "0295b4399a635813c4803e0668cc10dfe5e49adaefc4e9c45286f9ac5007cafe8d";

    /// `"not-a-private-key"` encrypted under [`FIXTURE_PASSWORD`].
    pub const FIXTURE_ENCRYPTED_NOT_HEX: &str = "7qiEvYt8zVt475QuX3PeRhY1D4GsAnqMmRbvLsLZyaCQ";
    /// 40 hex characters encrypted under [`FIXTURE_PASSWORD`].
    pub const FIXTURE_ENCRYPTED_SHORT_HEX: &str =
        "5cw3SikGWPcu2SV841biaCYP2993GMASYNV7kKfNdSvjduecHPsuS3qqDXTenGxJEv";
    /// 64 zeros encrypted under [`FIXTURE_PASSWORD`].
    pub const FIXTURE_ENCRYPTED_ZERO_KEY: &str =
        "95CQGGEWHEyFjxx3DBq5nddBDd76aEp4yF25Whot1xL2RZECDa1oqnxrSTEbdbCCQ7uRuR6wbdf7FQ3fQ4PzCuDVTjbGBu6fDiFbcZv2AjpxB";

    pub const SECOND_PRIVATE_KEY_HEX: &str =
        "f5f046c41813571b4c5d954e2b33a53e40dad939be49d5d17cf1563ca3d18d43";
    pub const SECOND_PASSWORD: &str = "other";
    pub const SECOND_ENCRYPTED_KEY: &str =
        "GYChkWPaC2NimQS7B2ZUtMF5hpRH7Rgj8wgjsk3NZsNY6uH65J1owfrNdXjAvU5y8CTksAbUWFT17dEYvjGm6uNRYQWvNYLVkwnw7WDCFWAWo";
    pub const SECOND_IDENTITY: &str =
        "02a0f4bd3946cbdada108600bd627885e98746c3b8219f4b064fea7a1c054af5ff";
}
