pub mod discovery;
pub mod health;
pub mod matches;
pub mod profile;
pub mod swipes;

#[cfg(test)]
pub(crate) mod test_support;
