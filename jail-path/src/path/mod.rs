pub mod confined_path;
pub mod entry;
pub(crate) mod handle;

#[cfg(test)]
mod tests;
