#[cfg(test)]
mod support;

#[cfg(test)]
mod rotation_tests;
