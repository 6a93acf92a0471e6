//! User-facing progress lines on stdout

/// A step is about to start
pub fn step(message: impl AsRef<str>) {
  println!("→ {}", message.as_ref());
}

/// Detail under the current step
pub fn detail(message: impl AsRef<str>) {
  println!("   {}", message.as_ref());
}

pub fn success(message: impl AsRef<str>) {
  println!("✅ {}", message.as_ref());
}

pub fn warning(message: impl AsRef<str>) {
  println!("⚠️  {}", message.as_ref());
}
