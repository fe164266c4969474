//! Compiler platform identifiers.

/// Operating system family the compiler binary is built for.
///
/// The nested installer archive ships one compiler build per family under
/// `extension/bin/<id>/`, so the platform id selects which subtree to unpack.
///
/// # Example
///
/// ```
/// use alkit_schema::Platform;
///
/// let current = Platform::current();
/// println!("Running on: {}", current);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    /// Microsoft Windows.
    Win32,
    /// macOS.
    Darwin,
    /// Linux.
    Linux,
}

impl Platform {
    /// Get the platform of the running process.
    pub fn current() -> Self {
        #[cfg(target_os = "windows")]
        {
            Self::Win32
        }
        #[cfg(target_os = "macos")]
        {
            Self::Darwin
        }
        #[cfg(not(any(target_os = "windows", target_os = "macos")))]
        {
            Self::Linux
        }
    }

    /// Directory name used inside the installer archive.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Win32 => "win32",
            Self::Darwin => "darwin",
            Self::Linux => "linux",
        }
    }

    /// File name of the compiler executable on this platform.
    pub fn executable_name(&self) -> &'static str {
        match self {
            Self::Win32 => "alc.exe",
            Self::Darwin | Self::Linux => "alc",
        }
    }

    /// Archive prefix holding this platform's compiler build, with a trailing `/`.
    pub fn archive_prefix(&self) -> String {
        format!("extension/bin/{}/", self.as_str())
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "win32" | "windows" => Ok(Self::Win32),
            "darwin" | "macos" | "osx" => Ok(Self::Darwin),
            "linux" => Ok(Self::Linux),
            _ => Err(format!("Unknown platform: {s}")),
        }
    }
}
