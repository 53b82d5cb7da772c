//! Worker command line assembly
//!
//! Pure assembly of the argument vector used to launch the worker JVM; no
//! filesystem or network access happens here.

use camino::{Utf8Path, Utf8PathBuf};
use std::collections::{BTreeMap, HashSet};

use crate::Result;
use crate::config::Config;

/// Bootstrap class of the worker process
pub const WORKER_MAIN_CLASS: &str = "org.jboss.arquillian.container.se.server.Main";

/// Debug agent that suspends the worker until a debugger attaches on 8787
pub const DEBUG_AGENT: &str = "-agentlib:jdwp=transport=dt_socket,address=8787,server=y,suspend=y";

/// Prefix of a system property flag
pub const SYSTEM_PROPERTY_SWITCH: &str = "-D";

/// Separator between class path entries
#[cfg(windows)]
pub const PATH_LIST_SEPARATOR: &str = ";";
#[cfg(not(windows))]
pub const PATH_LIST_SEPARATOR: &str = ":";

#[cfg(windows)]
const JAVA_BINARY: &str = "java.exe";
#[cfg(not(windows))]
const JAVA_BINARY: &str = "java";

/// Builder for the worker argument vector
#[derive(Debug)]
pub struct CommandBuilder<'a> {
    config: &'a Config,
    java_opts: &'a [String],
    class_path: Vec<Utf8PathBuf>,
    seen: HashSet<Utf8PathBuf>,
    system_properties: Option<&'a BTreeMap<String, String>>,
}

impl<'a> CommandBuilder<'a> {
    /// Create a builder; `java_opts` are the already tokenized extra options
    pub fn new(config: &'a Config, java_opts: &'a [String]) -> Self {
        Self {
            config,
            java_opts,
            class_path: Vec::new(),
            seen: HashSet::new(),
            system_properties: None,
        }
    }

    /// Append class path entries; paths already present are skipped
    pub fn class_path<I, P>(mut self, entries: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Utf8Path>,
    {
        for entry in entries {
            let entry = entry.as_ref();
            if self.seen.insert(entry.to_path_buf()) {
                self.class_path.push(entry.to_path_buf());
            }
        }
        self
    }

    /// Extra `-D` properties passed to the worker
    pub fn system_properties(mut self, properties: &'a BTreeMap<String, String>) -> Self {
        self.system_properties = Some(properties);
        self
    }

    /// The joined `-cp` value
    pub fn class_path_value(&self) -> String {
        self.class_path
            .iter()
            .map(|p| p.as_str())
            .collect::<Vec<_>>()
            .join(PATH_LIST_SEPARATOR)
    }

    /// Assemble the argument vector, program first.
    ///
    /// Fails with a configuration error when no runtime home is available.
    pub fn build(&self) -> Result<Vec<String>> {
        let java_home = self.config.resolve_java_home()?;

        let mut command = Vec::new();
        command.push(java_home.join("bin").join(JAVA_BINARY).into_string());
        command.push("-cp".to_string());
        command.push(self.class_path_value());

        command.push("-Dcom.sun.management.jmxremote".to_string());
        command.push(format!(
            "-Dcom.sun.management.jmxremote.port={}",
            self.config.port
        ));
        command.push("-Dcom.sun.management.jmxremote.authenticate=false".to_string());
        command.push("-Dcom.sun.management.jmxremote.ssl=false".to_string());

        if self.config.debug {
            command.push(DEBUG_AGENT.to_string());
        }

        command.extend(self.java_opts.iter().cloned());

        if let Some(properties) = self.system_properties {
            for (key, value) in properties {
                command.push(format!("{}{}={}", SYSTEM_PROPERTY_SWITCH, key, value));
            }
        }

        command.push(WORKER_MAIN_CLASS.to_string());
        Ok(command)
    }
}

/// Render an argument vector as one line for logging
pub fn render(command: &[String]) -> String {
    command.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> Config {
        Config {
            java_home: Some(Utf8PathBuf::from("/opt/jdk")),
            port: 4242,
            ..Config::default()
        }
    }

    #[test]
    fn test_minimal_command() {
        let config = config();
        let command = CommandBuilder::new(&config, &[])
            .class_path(["target/app.jar"])
            .build()
            .unwrap();

        let java = Utf8PathBuf::from("/opt/jdk").join("bin").join(JAVA_BINARY);
        assert_eq!(
            command,
            vec![
                java.as_str(),
                "-cp",
                "target/app.jar",
                "-Dcom.sun.management.jmxremote",
                "-Dcom.sun.management.jmxremote.port=4242",
                "-Dcom.sun.management.jmxremote.authenticate=false",
                "-Dcom.sun.management.jmxremote.ssl=false",
                WORKER_MAIN_CLASS,
            ]
        );
    }

    #[test]
    fn test_class_path_has_no_duplicates() {
        let config = config();
        let materialized = vec![
            Utf8PathBuf::from("target/classes"),
            Utf8PathBuf::from("lib/shared.jar"),
        ];
        let dependencies = vec![
            Utf8PathBuf::from("lib/shared.jar"),
            Utf8PathBuf::from("lib/other.jar"),
            Utf8PathBuf::from("target/classes"),
        ];

        let builder = CommandBuilder::new(&config, &[])
            .class_path(&materialized)
            .class_path(&dependencies);
        let value = builder.class_path_value();

        let mut entries: Vec<&str> = value.split(PATH_LIST_SEPARATOR).collect();
        entries.sort_unstable();
        assert_eq!(
            entries,
            vec!["lib/other.jar", "lib/shared.jar", "target/classes"]
        );
    }

    #[test]
    fn test_debug_options_and_properties_order() {
        let config = Config {
            debug: true,
            ..config()
        };
        let opts = vec!["-Xmx256m".to_string(), "-Xms128m".to_string()];
        let mut properties = BTreeMap::new();
        properties.insert("greeting".to_string(), "hello".to_string());

        let command = CommandBuilder::new(&config, &opts)
            .class_path(["target/classes"])
            .system_properties(&properties)
            .build()
            .unwrap();

        let tail: Vec<&str> = command[7..].iter().map(String::as_str).collect();
        assert_eq!(
            tail,
            vec![
                DEBUG_AGENT,
                "-Xmx256m",
                "-Xms128m",
                "-Dgreeting=hello",
                WORKER_MAIN_CLASS,
            ]
        );
    }

    #[test]
    fn test_render() {
        let command = vec!["java".to_string(), "-cp".to_string(), "a.jar".to_string()];
        assert_eq!(render(&command), "java -cp a.jar");
    }
}
