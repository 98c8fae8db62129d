//! # Tool Schemas
//!
//! The closed set of tools the model can call, and the function schemas
//! presented to it. Adding a tool means adding a [`ToolKind`] variant; the
//! compiler then points at every match that has to handle it.

use crate::provider::ToolDefinition;
use serde_json::json;

/// Every tool known to the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolKind {
    GetFilesInfo,
    GetFileContent,
    WriteFile,
    RunPythonFile,
}

impl ToolKind {
    pub const ALL: [ToolKind; 4] = [
        ToolKind::GetFilesInfo,
        ToolKind::GetFileContent,
        ToolKind::WriteFile,
        ToolKind::RunPythonFile,
    ];

    /// Wire name used in tool calls
    pub fn name(&self) -> &'static str {
        match self {
            ToolKind::GetFilesInfo => "get_files_info",
            ToolKind::GetFileContent => "get_file_content",
            ToolKind::WriteFile => "write_file",
            ToolKind::RunPythonFile => "run_python_file",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    pub fn description(&self) -> &'static str {
        match self {
            ToolKind::GetFilesInfo => {
                "Lists files in a specified directory relative to the working directory, providing file size and directory status"
            }
            ToolKind::GetFileContent => {
                "Reads and returns the content of a specified file (up to 10,000 characters)"
            }
            ToolKind::WriteFile => {
                "Writes content to a file at the specified path, creating directories if needed"
            }
            ToolKind::RunPythonFile => {
                "Executes a Python file and returns its output (stdout and stderr)"
            }
        }
    }

    /// JSON schema of the arguments object
    pub fn parameters(&self) -> serde_json::Value {
        match self {
            ToolKind::GetFilesInfo => json!({
                "type": "object",
                "properties": {
                    "directory": {
                        "type": "string",
                        "description": "Directory path to list files from, relative to the working directory (use '.' for current directory)"
                    }
                },
                "required": []
            }),
            ToolKind::GetFileContent => json!({
                "type": "object",
                "properties": {
                    "file_path": {
                        "type": "string",
                        "description": "Path to the file to read, relative to the working directory"
                    }
                },
                "required": ["file_path"]
            }),
            ToolKind::WriteFile => json!({
                "type": "object",
                "properties": {
                    "file_path": {
                        "type": "string",
                        "description": "Path to the file to write, relative to the working directory"
                    },
                    "content": {
                        "type": "string",
                        "description": "Content to write to the file"
                    }
                },
                "required": ["file_path", "content"]
            }),
            ToolKind::RunPythonFile => json!({
                "type": "object",
                "properties": {
                    "file_path": {
                        "type": "string",
                        "description": "Path to the Python file to execute, relative to the working directory"
                    },
                    "args": {
                        "type": "array",
                        "items": { "type": "string" },
                        "description": "Optional command-line arguments to pass to the Python script"
                    }
                },
                "required": ["file_path"]
            }),
        }
    }

    pub fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(self.name(), self.description()).with_parameters(self.parameters())
    }
}

/// Schemas for every tool, in registry order
pub fn tool_definitions() -> Vec<ToolDefinition> {
    ToolKind::ALL.iter().map(ToolKind::definition).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_round_trip() {
        for kind in ToolKind::ALL {
            assert_eq!(ToolKind::from_name(kind.name()), Some(kind));
        }
        assert_eq!(ToolKind::from_name("delete_everything"), None);
    }

    #[test]
    fn test_required_parameters() {
        let defs = tool_definitions();
        assert_eq!(defs.len(), 4);

        let required = |name: &str| -> Vec<String> {
            let def = defs.iter().find(|d| d.name == name).unwrap();
            serde_json::from_value(def.parameters["required"].clone()).unwrap()
        };
        assert!(required("get_files_info").is_empty());
        assert_eq!(required("get_file_content"), vec!["file_path"]);
        assert_eq!(required("write_file"), vec!["file_path", "content"]);
        assert_eq!(required("run_python_file"), vec!["file_path"]);
    }

    #[test]
    fn test_args_is_string_array() {
        let params = ToolKind::RunPythonFile.parameters();
        assert_eq!(params["properties"]["args"]["type"], "array");
        assert_eq!(params["properties"]["args"]["items"]["type"], "string");
    }
}
