#[cfg(test)]
mod refresh_token_tests;
