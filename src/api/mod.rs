pub mod attendance;
pub mod notifications;

#[cfg(test)]
pub(crate) mod test_support;
