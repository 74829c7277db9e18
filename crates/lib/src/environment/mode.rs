use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Compilation mode of a build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildMode {
  Debug,
  Profile,
  Release,
}

impl BuildMode {
  pub const ALL: [BuildMode; 3] = [BuildMode::Debug, BuildMode::Profile, BuildMode::Release];

  /// Returns the lowercase string identifier for this mode
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Debug => "debug",
      Self::Profile => "profile",
      Self::Release => "release",
    }
  }
}

impl fmt::Display for BuildMode {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

impl FromStr for BuildMode {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Self::ALL
      .into_iter()
      .find(|mode| mode.as_str() == s)
      .ok_or_else(|| format!("unknown build mode '{s}' (expected debug, profile or release)"))
  }
}

/// Platform a bundle is compiled for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TargetPlatform {
  AndroidArm,
  AndroidArm64,
  AndroidX64,
  Ios,
  Darwin,
  LinuxX64,
  LinuxArm64,
  WindowsX64,
  FuchsiaArm64,
  FuchsiaX64,
  Tester,
  WebJavascript,
}

impl TargetPlatform {
  pub const ALL: [TargetPlatform; 12] = [
    TargetPlatform::AndroidArm,
    TargetPlatform::AndroidArm64,
    TargetPlatform::AndroidX64,
    TargetPlatform::Ios,
    TargetPlatform::Darwin,
    TargetPlatform::LinuxX64,
    TargetPlatform::LinuxArm64,
    TargetPlatform::WindowsX64,
    TargetPlatform::FuchsiaArm64,
    TargetPlatform::FuchsiaX64,
    TargetPlatform::Tester,
    TargetPlatform::WebJavascript,
  ];

  /// Returns the string identifier used in artifact directories and manifests
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::AndroidArm => "android-arm",
      Self::AndroidArm64 => "android-arm64",
      Self::AndroidX64 => "android-x64",
      Self::Ios => "ios",
      Self::Darwin => "darwin",
      Self::LinuxX64 => "linux-x64",
      Self::LinuxArm64 => "linux-arm64",
      Self::WindowsX64 => "windows-x64",
      Self::FuchsiaArm64 => "fuchsia-arm64",
      Self::FuchsiaX64 => "fuchsia-x64",
      Self::Tester => "tester",
      Self::WebJavascript => "web-javascript",
    }
  }

  /// Detect the host platform at runtime
  ///
  /// Returns `None` if the host is not a supported desktop platform
  pub fn host() -> Option<Self> {
    match (std::env::consts::OS, std::env::consts::ARCH) {
      ("linux", "x86_64") => Some(Self::LinuxX64),
      ("linux", "aarch64") => Some(Self::LinuxArm64),
      ("macos", _) => Some(Self::Darwin),
      ("windows", "x86_64") => Some(Self::WindowsX64),
      _ => None,
    }
  }
}

impl fmt::Display for TargetPlatform {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

impl FromStr for TargetPlatform {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Self::ALL
      .into_iter()
      .find(|platform| platform.as_str() == s)
      .ok_or_else(|| format!("unknown target platform '{s}'"))
  }
}
