//! Tag list subcommand implementation

use anyhow::Result;
use tagwarden_core::config::ReleaseConfig;
use tagwarden_core::errors::ConfigError;
use tagwarden_core::outputs::StepOutputs;
use tagwarden_core::tag_list::{write_tag_list, TagListInput, TagListOutput, Templates};
use tracing::info;

/// Arguments for the tag-list subcommand.
#[derive(Debug, Clone)]
pub struct TagListArgs {
    pub image: String,
    pub image_name: String,
    pub deprecated: bool,
    pub maintained_tags: Vec<String>,
    pub all_tags: Vec<String>,
    pub latest_tag_built: bool,
}

impl TagListArgs {
    fn into_input(self) -> Result<TagListInput> {
        for (name, value) in [("image", &self.image), ("image-name", &self.image_name)] {
            if value.trim().is_empty() {
                return Err(ConfigError::MissingInput {
                    name: name.to_string(),
                }
                .into());
            }
        }
        Ok(TagListInput {
            image: self.image.trim().to_string(),
            image_name: self.image_name.trim().to_string(),
            deprecated: self.deprecated,
            maintained_tags: self.maintained_tags,
            all_tags: self.all_tags,
            latest_tag_built: self.latest_tag_built,
        })
    }
}

/// Render and write the tag list page
pub fn build(args: TagListArgs, config: &ReleaseConfig) -> Result<TagListOutput> {
    let input = args.into_input()?;
    info!("Building tag list for image: {}", input.image_name);
    let templates = Templates::new(config.template_dir.as_deref());
    Ok(write_tag_list(&input, &templates, &config.output_dir)?)
}

/// Executes the tag-list subcommand and writes its step outputs.
pub fn run(args: TagListArgs, config: &ReleaseConfig) -> Result<()> {
    let output = build(args, config)?;
    StepOutputs::from_env().set_all([
        ("tag-list-file", output.file.display().to_string()),
        ("tag-list-output-dir", output.output_dir.display().to_string()),
    ])?;
    Ok(())
}
