use anyhow::Result;

pub fn cmd_version() -> Result<()> {
  println!("xbuild {}", env!("CARGO_PKG_VERSION"));
  Ok(())
}
