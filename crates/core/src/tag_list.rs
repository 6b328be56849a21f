//! Tag list page rendering
//!
//! Produces an HTML page listing the maintained and still-available tags of
//! an image. Pages are assembled from small `${KEY}` placeholder templates;
//! built-in defaults are compiled in and can be replaced per file through a
//! template directory (`<template_dir>/taglist/<name>`).

use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument};

use crate::errors::{Result, TemplateError};
use crate::version::sort_descending;

const BUILTIN_TEMPLATES: &[(&str, &str)] = &[
    (
        "index.html.tpl",
        include_str!("../templates/taglist/index.html.tpl"),
    ),
    ("tag.html.tpl", include_str!("../templates/taglist/tag.html.tpl")),
    (
        "section.maintained.html.tpl",
        include_str!("../templates/taglist/section.maintained.html.tpl"),
    ),
    (
        "section.available.html.tpl",
        include_str!("../templates/taglist/section.available.html.tpl"),
    ),
    (
        "section.deprecated.html.tpl",
        include_str!("../templates/taglist/section.deprecated.html.tpl"),
    ),
    (
        "warning.deprecated.html.tpl",
        include_str!("../templates/taglist/warning.deprecated.html.tpl"),
    ),
];

/// Replace `${KEY}` placeholders, where `KEY` is the upper-cased data key
///
/// Absent values render as empty strings. Placeholders without a data entry
/// are left untouched.
///
/// ```rust
/// use tagwarden_core::tag_list::render_template;
///
/// let out = render_template("<li>${TAG}</li>${EXTRA}", &[("tag", Some("1.2")), ("extra", None)]);
/// assert_eq!(out, "<li>1.2</li>");
/// ```
pub fn render_template(template: &str, data: &[(&str, Option<&str>)]) -> String {
    let mut content = template.to_string();
    for (key, value) in data {
        let placeholder = format!("${{{}}}", key.to_uppercase());
        content = content.replace(&placeholder, value.unwrap_or(""));
    }
    content
}

/// Template lookup with an optional override directory
#[derive(Debug, Clone, Default)]
pub struct Templates {
    override_dir: Option<PathBuf>,
}

impl Templates {
    pub fn new(template_dir: Option<&Path>) -> Self {
        Self {
            override_dir: template_dir.map(|dir| dir.join("taglist")),
        }
    }

    /// Template source, from the override directory when present there
    pub fn load(&self, name: &str) -> Result<String> {
        if let Some(dir) = &self.override_dir {
            let path = dir.join(name);
            if path.is_file() {
                debug!("Using template override {}", path.display());
                return Ok(std::fs::read_to_string(&path).map_err(TemplateError::Io)?);
            }
        }
        BUILTIN_TEMPLATES
            .iter()
            .find(|(builtin, _)| *builtin == name)
            .map(|(_, content)| content.to_string())
            .ok_or_else(|| {
                TemplateError::NotFound {
                    name: name.to_string(),
                }
                .into()
            })
    }

    pub fn render(&self, name: &str, data: &[(&str, Option<&str>)]) -> Result<String> {
        Ok(render_template(&self.load(name)?, data))
    }
}

/// Inputs of the tag list page (the `discover` outputs)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TagListInput {
    /// Full image name without tag, e.g. `neunerlei/php`
    pub image: String,
    /// Display name, e.g. `neunerlei/php (fpm)`
    pub image_name: String,
    pub deprecated: bool,
    pub maintained_tags: Vec<String>,
    pub all_tags: Vec<String>,
    pub latest_tag_built: bool,
}

/// Tags grouped for display, newest first
#[derive(Debug, Clone, PartialEq)]
pub struct TagGroups {
    /// Maintained tags, led by `latest` when it was built
    pub maintained: Vec<String>,
    /// All other known tags
    pub available: Vec<String>,
}

impl TagListInput {
    pub fn groups(&self) -> TagGroups {
        let mut maintained = sort_descending(self.maintained_tags.iter().cloned());
        let available: Vec<String> = sort_descending(self.all_tags.iter().cloned())
            .into_iter()
            .filter(|tag| !maintained.contains(tag))
            .collect();
        if self.latest_tag_built {
            maintained.insert(0, "latest".to_string());
        }
        TagGroups {
            maintained,
            available,
        }
    }
}

/// Paths written by [`write_tag_list`]
#[derive(Debug, Clone, PartialEq)]
pub struct TagListOutput {
    pub file: PathBuf,
    pub output_dir: PathBuf,
}

/// Render the complete tag list page
pub fn render_tag_list(input: &TagListInput, templates: &Templates) -> Result<String> {
    let groups = input.groups();
    info!(
        "Maintained Tags ({}): {}",
        groups.maintained.len(),
        groups.maintained.join(", ")
    );
    info!(
        "Available Tags ({}): {}",
        groups.available.len(),
        groups.available.join(", ")
    );

    let render_section = |tags: &[String], template: &str| -> Result<Option<String>> {
        if tags.is_empty() {
            return Ok(None);
        }
        let items = tags
            .iter()
            .map(|tag| {
                templates.render(
                    "tag.html.tpl",
                    &[("tag", Some(tag.as_str())), ("image", Some(input.image.as_str()))],
                )
            })
            .collect::<Result<Vec<_>>>()?
            .join("\n");
        templates
            .render(template, &[("tags", Some(items.as_str()))])
            .map(Some)
    };

    let (warning, deprecated_section, maintained_section, available_section) = if input.deprecated
    {
        let message = if groups.maintained.is_empty() {
            ".".to_string()
        } else {
            format!(
                ", for a limited time the following versions will still be built regularly: <strong>{}</strong>",
                groups.maintained.join(", ")
            )
        };
        let warning =
            templates.render("warning.deprecated.html.tpl", &[("message", Some(message.as_str()))])?;
        let all: Vec<String> = groups
            .maintained
            .iter()
            .chain(groups.available.iter())
            .cloned()
            .collect();
        (
            Some(warning),
            render_section(&all, "section.deprecated.html.tpl")?,
            None,
            None,
        )
    } else {
        (
            None,
            None,
            render_section(&groups.maintained, "section.maintained.html.tpl")?,
            render_section(&groups.available, "section.available.html.tpl")?,
        )
    };

    templates.render(
        "index.html.tpl",
        &[
            ("image", Some(input.image.as_str())),
            ("image_name", Some(input.image_name.as_str())),
            ("deprecated_warning", warning.as_deref()),
            ("deprecated_section", deprecated_section.as_deref()),
            ("maintained_section", maintained_section.as_deref()),
            ("available_section", available_section.as_deref()),
        ],
    )
}

/// File name of the tag list page for a display name
///
/// ```rust
/// use tagwarden_core::tag_list::tag_list_file_name;
///
/// assert_eq!(tag_list_file_name("neunerlei/php (fpm)"), "neunerlei-php-fpm-tags.html");
/// ```
pub fn tag_list_file_name(image_name: &str) -> String {
    let mut sanitized = String::with_capacity(image_name.len());
    for c in image_name.chars() {
        let c = if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
            c
        } else {
            '-'
        };
        if c == '-' && sanitized.ends_with('-') {
            continue;
        }
        sanitized.push(c);
    }
    format!("{}-tags.html", sanitized.trim_matches('-'))
}

/// Render the page and write it to `<output_dir>/tag-lists/`
#[instrument(level = "info", skip(input, templates), fields(image = %input.image))]
pub fn write_tag_list(
    input: &TagListInput,
    templates: &Templates,
    output_dir: &Path,
) -> Result<TagListOutput> {
    let page = render_tag_list(input, templates)?;
    let tag_list_dir = output_dir.join("tag-lists");
    std::fs::create_dir_all(&tag_list_dir).map_err(TemplateError::Io)?;

    let file = tag_list_dir.join(tag_list_file_name(&input.image_name));
    info!("Writing tag list HTML file to: {}", file.display());
    std::fs::write(&file, page).map_err(TemplateError::Io)?;

    Ok(TagListOutput {
        file,
        output_dir: tag_list_dir,
    })
}
