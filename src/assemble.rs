//! Target-folder assembly: auxiliary inputs and the generated engine config.
//!
//! The generated `custom_client.rb` is opaque Ruby consumed by chef-client.
//! Everything that produces it stays typed; the output is only ever text.
use crate::engine_command::{ATTRIBUTES_FILE, CUSTOM_CONFIG_FILE, ENGINE_STATE_DIR};
use crate::error::PipelineError;
use crate::notifier::HANDLER_NAME;
use crate::resolver::COOKBOOKS_DIR;
use crate::sdk_config::{self, HandlerSpec};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Base engine config written by `chef export`.
pub const BASE_CONFIG_FILE: &str = "client.rb";
pub const DATA_BAGS_DIR: &str = "data_bags";
/// Ruby namespace the handler classes live under.
const HANDLER_NAMESPACE: &str = "Chef::Handler";
/// Require path prefix for handler implementations.
const HANDLER_REQUIRE_PREFIX: &str = "cookbook_sdk/handlers";
/// Lines bracketing the region of the custom config that prepare owns.
const GENERATED_BEGIN: &str = "# >>> cbsdk generated >>>";
const GENERATED_END: &str = "# <<< cbsdk generated <<<";

/// Chef handler that forwards every lifecycle phase to `cbsdk notify`.
const NOTIFY_HANDLER_CLASS: &str = r#"require 'chef/handler'
unless defined?(CookbookSdkNotifyHandler)
  class CookbookSdkNotifyHandler < Chef::Handler
    def initialize(program, handler, settings)
      @program = program
      @handler = handler
      @settings = settings
    end

    def report
      args = ['notify', '--handler', @handler, '--settings', @settings]
      if run_status.end_time.nil?
        args += ['--phase', 'start']
      else
        args += ['--phase', run_status.success? ? 'success' : 'failure',
                 '--elapsed', run_status.elapsed_time.to_s]
        args << "--cause=#{run_status.formatted_exception}" if run_status.failed?
      end
      run_node = run_status.node
      node_name = run_node ? run_node.name : Chef::Config[:node_name]
      args += ['--node', node_name.to_s, '--run-list', run_node ? run_node.run_list.to_s : '']
      Chef::Log.warn("cbsdk notify failed for #{@handler}") unless system(@program, *args)
    end
  end
end
"#;

/// Optional inputs copied from the base dir when present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Auxiliary {
    Attributes,
    DataBags,
}

impl Auxiliary {
    pub fn file_name(self) -> &'static str {
        match self {
            Auxiliary::Attributes => ATTRIBUTES_FILE,
            Auxiliary::DataBags => DATA_BAGS_DIR,
        }
    }
}

/// Copy an auxiliary input into the target folder.
///
/// Returns `Ok(false)` when the source does not exist.
pub fn copy_auxiliary(
    kind: Auxiliary,
    base_dir: &Path,
    target_folder: &Path,
) -> Result<bool, PipelineError> {
    let source = base_dir.join(kind.file_name());
    let dest = target_folder.join(kind.file_name());
    let copied = match kind {
        Auxiliary::Attributes if source.is_file() => {
            fs::create_dir_all(target_folder)
                .map_err(|err| PipelineError::io(target_folder, err))?;
            fs::copy(&source, &dest).map_err(|err| PipelineError::io(&source, err))?;
            true
        }
        Auxiliary::DataBags if source.is_dir() => {
            copy_dir_recursive(&source, &dest)?;
            true
        }
        _ => false,
    };
    if copied {
        tracing::info!("Copied '{}' to '{}'", source.display(), dest.display());
    } else {
        tracing::debug!(path = %source.display(), "no {} to copy", kind.file_name());
    }
    Ok(copied)
}

fn copy_dir_recursive(source: &Path, dest: &Path) -> Result<(), PipelineError> {
    fs::create_dir_all(dest).map_err(|err| PipelineError::io(dest, err))?;
    let entries = fs::read_dir(source).map_err(|err| PipelineError::io(source, err))?;
    for entry in entries {
        let entry = entry.map_err(|err| PipelineError::io(source, err))?;
        let path = entry.path();
        let target = dest.join(entry.file_name());
        let file_type = entry
            .file_type()
            .map_err(|err| PipelineError::io(&path, err))?;
        if file_type.is_dir() {
            copy_dir_recursive(&path, &target)?;
        } else if file_type.is_symlink() && path.is_dir() {
            tracing::warn!(path = %path.display(), "skipping symlinked directory in data bags");
        } else {
            fs::copy(&path, &target).map_err(|err| PipelineError::io(&path, err))?;
        }
    }
    Ok(())
}

/// What went into a generated runtime config.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfigSummary {
    pub path: PathBuf,
    pub handlers: Vec<String>,
}

/// Write `custom_client.rb`: base content plus the generated section.
///
/// With `copy_base_template` the base content is `client.rb`; otherwise it
/// is the existing custom file (or nothing). Any generated section already
/// present is replaced, so repeated prepares yield the same file.
pub fn generate_runtime_config(
    target_folder: &Path,
    sdk_config_path: &Path,
    copy_base_template: bool,
    notify_program: &Path,
) -> Result<RuntimeConfigSummary, PipelineError> {
    let custom = target_folder.join(CUSTOM_CONFIG_FILE);
    tracing::info!("Creating custom '{BASE_CONFIG_FILE}' in {} ...", target_folder.display());

    fs::create_dir_all(target_folder).map_err(|err| PipelineError::io(target_folder, err))?;
    let base_text = if copy_base_template {
        let base = target_folder.join(BASE_CONFIG_FILE);
        if !base.is_file() {
            return Err(PipelineError::MissingBaseTemplate { path: base });
        }
        fs::read_to_string(&base).map_err(|err| PipelineError::io(&base, err))?
    } else {
        match fs::read_to_string(&custom) {
            Ok(text) => text,
            Err(err) if err.kind() == ErrorKind::NotFound => String::new(),
            Err(err) => return Err(PipelineError::io(&custom, err)),
        }
    };

    let handlers = sdk_config::load_optional(sdk_config_path)
        .map(|config| config.handler_specs())
        .unwrap_or_default();

    let mut text = strip_generated_section(&base_text);
    if !text.is_empty() && !text.ends_with('\n') {
        text.push('\n');
    }
    text.push_str(&render_generated_section(target_folder, &handlers, notify_program));
    fs::write(&custom, text).map_err(|err| PipelineError::io(&custom, err))?;

    tracing::info!("Wrote a custom {BASE_CONFIG_FILE} to '{}'", custom.display());
    Ok(RuntimeConfigSummary {
        path: custom,
        handlers: handlers.into_iter().map(|spec| spec.name).collect(),
    })
}

fn render_generated_section(
    target_folder: &Path,
    handlers: &[HandlerSpec],
    notify_program: &Path,
) -> String {
    let mut text = format!("{GENERATED_BEGIN}\n");
    text.push_str(&render_cache_path_block(target_folder));
    if !handlers.is_empty() {
        text.push_str("\nrequire 'json'\n");
        for spec in handlers {
            text.push_str(&render_handler_block(spec, notify_program));
        }
    }
    text.push_str(GENERATED_END);
    text.push('\n');
    text
}

/// Drop every line between (and including) the generated-section markers.
fn strip_generated_section(text: &str) -> String {
    let mut kept = String::with_capacity(text.len());
    let mut inside = false;
    for line in text.split_inclusive('\n') {
        match line.trim_end() {
            GENERATED_BEGIN => inside = true,
            GENERATED_END => inside = false,
            _ if !inside => kept.push_str(line),
            _ => {}
        }
    }
    kept
}

/// Keep the engine cache inside the target folder so no root is needed.
pub fn render_cache_path_block(target_folder: &Path) -> String {
    let cache = target_folder.join(ENGINE_STATE_DIR);
    format!(
        "\n# Run chef-client without root privileges.\ncache_path {}\n",
        ruby_string(&cache.display().to_string())
    )
}

/// Instantiate one handler and register it for start, report and exception
/// phases.
///
/// The notifier handler calls back into `notify_program`; any other handler
/// is required from the cookbook SDK gem.
pub fn render_handler_block(spec: &HandlerSpec, notify_program: &Path) -> String {
    let ident = ruby_identifier(&spec.name);
    let var = format!("{ident}_handler");
    let settings = ruby_string(&spec.settings.to_string());
    let construct = if spec.name == HANDLER_NAME {
        format!(
            "{NOTIFY_HANDLER_CLASS}{var}_settings = {settings}\n\
             {var} = CookbookSdkNotifyHandler.new({program}, {name}, {var}_settings)\n",
            program = ruby_string(&notify_program.display().to_string()),
            name = ruby_string(&spec.name),
        )
    } else {
        format!(
            "require {require}\n\
             {var}_settings = JSON.parse({settings}, symbolize_names: true)\n\
             {var} = {HANDLER_NAMESPACE}::{class}.new({var}_settings)\n",
            require = ruby_string(&format!("{HANDLER_REQUIRE_PREFIX}/{}", spec.name)),
            class = ruby_class_name(&spec.name),
        )
    };
    format!(
        "\n# Handler {ident}\n{construct}\
         start_handlers << {var}\n\
         report_handlers << {var}\n\
         exception_handlers << {var}\n"
    )
}

fn ruby_string(raw: &str) -> String {
    let escaped = raw.replace('\\', "\\\\").replace('\'', "\\'");
    format!("'{escaped}'")
}

fn ruby_identifier(name: &str) -> String {
    let ident: String = name
        .chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() {
                ch.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect();
    if ident.starts_with(|ch: char| ch.is_ascii_digit()) {
        format!("h_{ident}")
    } else {
        ident
    }
}

fn ruby_class_name(name: &str) -> String {
    name.split(|ch: char| !ch.is_ascii_alphanumeric())
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect()
}

/// Remove every copied input so prepare starts from a clean target folder.
pub fn reset_target(target_folder: &Path) -> Result<(), PipelineError> {
    clean_generated(target_folder)?;
    let attributes = target_folder.join(ATTRIBUTES_FILE);
    match fs::remove_file(&attributes) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
        Err(err) => Err(PipelineError::io(&attributes, err)),
    }
}

/// Remove generated cookbooks and copied data bags; missing paths are fine.
pub fn clean_generated(target_folder: &Path) -> Result<(), PipelineError> {
    for rel in [COOKBOOKS_DIR, DATA_BAGS_DIR] {
        let path = target_folder.join(rel);
        tracing::info!("Cleaning up '{}' ...", path.display());
        match fs::remove_dir_all(&path) {
            Ok(()) => {}
            Err(err) if err.kind() == ErrorKind::NotFound => {}
            Err(err) => return Err(PipelineError::io(&path, err)),
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "assemble_tests.rs"]
mod tests;
