use camino::{Utf8Path, Utf8PathBuf};
use std::fs;
use std::io;
use std::thread;
use std::time::{Duration, Instant};
use tempfile::TempDir;

/// A runtime home whose `bin/java` is a shell script
///
/// The script writes each argument on its own line to [`FakeJvm::args_file`]
/// and then replaces itself with `sleep`, so the process stays alive until
/// it is killed.
pub struct FakeJvm {
    _dir: TempDir,
    home: Utf8PathBuf,
    args_file: Utf8PathBuf,
}

impl FakeJvm {
    /// Install the script into a fresh temporary directory
    ///
    /// # Example
    /// ```no_run
    /// use semanaged_integration_tests::fake_jvm::FakeJvm;
    ///
    /// let jvm = FakeJvm::install().unwrap();
    /// // ... deploy with `java_home = jvm.home()` ...
    /// let args = jvm.wait_for_args(std::time::Duration::from_secs(5));
    /// ```
    pub fn install() -> io::Result<Self> {
        let dir = tempfile::tempdir()?;
        let base = Utf8Path::from_path(dir.path())
            .ok_or_else(|| io::Error::other("temporary directory is not UTF-8"))?
            .to_path_buf();

        let home = base.join("jdk");
        let bin = home.join("bin");
        fs::create_dir_all(&bin)?;

        let args_file = base.join("java.args");
        let script = format!(
            "#!/bin/sh\nprintf '%s\\n' \"$@\" > '{}.tmp'\nmv '{}.tmp' '{}'\nexec sleep 30\n",
            args_file, args_file, args_file
        );
        let java = bin.join("java");
        fs::write(&java, script)?;
        make_executable(&java)?;

        Ok(Self {
            _dir: dir,
            home,
            args_file,
        })
    }

    pub fn home(&self) -> &Utf8Path {
        &self.home
    }

    pub fn args_file(&self) -> &Utf8Path {
        &self.args_file
    }

    /// Arguments of the most recent launch, once the script has written them
    pub fn wait_for_args(&self, timeout: Duration) -> Option<Vec<String>> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Ok(content) = fs::read_to_string(&self.args_file) {
                return Some(content.lines().map(str::to_string).collect());
            }
            if Instant::now() >= deadline {
                return None;
            }
            thread::sleep(Duration::from_millis(20));
        }
    }

    /// Forget the recorded arguments so the next launch can be observed
    pub fn reset(&self) -> io::Result<()> {
        match fs::remove_file(&self.args_file) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }
}

#[cfg(unix)]
fn make_executable(path: &Utf8Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o755))
}

#[cfg(not(unix))]
fn make_executable(_path: &Utf8Path) -> io::Result<()> {
    Ok(())
}
