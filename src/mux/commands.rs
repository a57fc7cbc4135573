use std::path::Path;

/// Abstract merge tool command representation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MuxCommand {
    pub binary_path: String,
    pub args: Vec<String>,
    pub description: String,
}

impl MuxCommand {
    /// Create a new merge tool command
    pub fn new<S1: Into<String>, S2: Into<String>>(binary_path: S1, description: S2) -> Self {
        Self {
            binary_path: binary_path.into(),
            args: Vec::new(),
            description: description.into(),
        }
    }

    /// Add an argument
    pub fn arg<S: Into<String>>(mut self, arg: S) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Add a source file
    pub fn input<P: AsRef<Path>>(self, path: P) -> Self {
        self.arg(path.as_ref().to_string_lossy().to_string())
    }

    /// Set the output file
    pub fn output<P: AsRef<Path>>(self, path: P) -> Self {
        self.arg("--output").arg(path.as_ref().to_string_lossy().to_string())
    }

    /// Drop audio tracks of the next source
    pub fn no_audio(self) -> Self {
        self.arg("--no-audio")
    }

    /// Set the language of a track in the next source
    pub fn language<S: AsRef<str>>(self, track: u32, code: S) -> Self {
        self.arg("--language").arg(format!("{}:{}", track, code.as_ref()))
    }

    /// Set the name of a track in the next source
    pub fn track_name<S: AsRef<str>>(self, track: u32, name: S) -> Self {
        self.arg("--track-name").arg(format!("{}:{}", track, name.as_ref()))
    }

    /// Render the command the way a shell would need it typed
    pub fn display_line(&self) -> String {
        std::iter::once(self.binary_path.as_str())
            .chain(self.args.iter().map(String::as_str))
            .map(shell_quote)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

fn shell_quote(arg: &str) -> String {
    let plain = !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '-' | '_' | '.' | '/' | ':' | '=' | ','));
    if plain {
        arg.to_string()
    } else {
        format!("\"{}\"", arg.replace('\\', "\\\\").replace('"', "\\\""))
    }
}

/// Builder for merge tool invocations
pub struct MuxCommandBuilder {
    binary_path: String,
}

impl MuxCommandBuilder {
    /// Create a new command builder
    pub fn new<S: Into<String>>(binary_path: S) -> Self {
        Self {
            binary_path: binary_path.into(),
        }
    }

    /// Build the merge command: video without its own audio, then every
    /// audio track tagged with the same language and track name
    pub fn merge_audio<P: AsRef<Path>>(
        &self,
        video_path: P,
        audio_paths: &[P],
        output_path: P,
        language: &str,
        track_name: &str,
    ) -> MuxCommand {
        let mut cmd = MuxCommand::new(&self.binary_path, "Audio merge")
            .output(output_path)
            .no_audio()
            .input(video_path);

        for audio in audio_paths {
            cmd = cmd
                .language(0, language)
                .track_name(0, track_name)
                .input(audio);
        }

        cmd
    }

    /// Build version check command
    pub fn version_check(&self) -> MuxCommand {
        MuxCommand::new(&self.binary_path, "Version check").arg("--version")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_merge_command_layout() {
        let builder = MuxCommandBuilder::new("mkvmerge");
        let cmd = builder.merge_audio(
            PathBuf::from("Episodes/Show E01.mp4"),
            &[
                PathBuf::from("Audio/Show - 01 Group.mka"),
                PathBuf::from("Audio/Show - 01 Group2.mka"),
            ],
            PathBuf::from("Output/Show E01.mkv"),
            "rus",
            "Dub",
        );

        assert_eq!(cmd.binary_path, "mkvmerge");
        assert_eq!(
            cmd.args,
            vec![
                "--output", "Output/Show E01.mkv",
                "--no-audio", "Episodes/Show E01.mp4",
                "--language", "0:rus", "--track-name", "0:Dub", "Audio/Show - 01 Group.mka",
                "--language", "0:rus", "--track-name", "0:Dub", "Audio/Show - 01 Group2.mka",
            ]
        );
    }

    #[test]
    fn test_version_check() {
        let cmd = MuxCommandBuilder::new("mkvmerge").version_check();
        assert_eq!(cmd.args, vec!["--version"]);
    }

    #[test]
    fn test_display_line_quotes_spaces() {
        let cmd = MuxCommand::new("mkvmerge", "test")
            .output("Out Dir/a b.mkv")
            .no_audio()
            .track_name(0, "Озвучка");
        assert_eq!(
            cmd.display_line(),
            "mkvmerge --output \"Out Dir/a b.mkv\" --no-audio --track-name 0:Озвучка"
        );
    }

    #[test]
    fn test_display_line_escapes_quotes() {
        let cmd = MuxCommand::new("mkvmerge", "test").arg("say \"hi\"").arg("");
        assert_eq!(cmd.display_line(), "mkvmerge \"say \\\"hi\\\"\" \"\"");
    }
}
