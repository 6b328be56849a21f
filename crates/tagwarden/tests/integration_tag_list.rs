//! End-to-end tests for `tagwarden tag-list`.

use tempfile::TempDir;

mod support;
use support::{read_outputs, tagwarden};

#[test]
fn tag_list_honours_config_file_and_template_overrides() {
    let tmp = TempDir::new().unwrap();
    std::fs::write(
        tmp.path().join("tagwarden.toml"),
        "output_dir = \"public\"\ntemplate_dir = \"templates\"\n",
    )
    .unwrap();
    let override_dir = tmp.path().join("templates/taglist");
    std::fs::create_dir_all(&override_dir).unwrap();
    std::fs::write(
        override_dir.join("tag.html.tpl"),
        "<li data-image=\"${IMAGE}\">${TAG}</li>",
    )
    .unwrap();
    let output_file = tmp.path().join("github-output");

    tagwarden(tmp.path())
        .args(["tag-list", "--image", "neunerlei/php", "--image-name", "neunerlei/php (fpm)"])
        .args(["--maintained-tags", "8.3-fpm", "--all-tags", "8.1-fpm,8.2-fpm,8.3-fpm"])
        .env("GITHUB_OUTPUT", &output_file)
        .assert()
        .success();

    let page_path = tmp.path().join("public/tag-lists/neunerlei-php-fpm-tags.html");
    let page = std::fs::read_to_string(&page_path).unwrap();
    assert!(page.contains("<li data-image=\"neunerlei/php\">8.3-fpm</li>"));
    assert!(page.contains("<li data-image=\"neunerlei/php\">8.1-fpm</li>"));
    assert!(page.contains("Maintained tags"));
    assert!(page.contains("Available tags"));

    let outputs = read_outputs(&output_file);
    assert_eq!(
        outputs["tag-list-output-dir"],
        tmp.path().join("public/tag-lists").to_string_lossy()
    );
}

#[test]
fn tag_list_for_deprecated_image_renders_warning() {
    let tmp = TempDir::new().unwrap();

    tagwarden(tmp.path())
        .args(["--output-dir", "out"])
        .args(["tag-list", "--image", "neunerlei/node", "--image-name", "neunerlei/node"])
        .args(["--deprecated", "true", "--maintained-tags", "18", "--all-tags", "16,18"])
        .assert()
        .success();

    let page =
        std::fs::read_to_string(tmp.path().join("out/tag-lists/neunerlei-node-tags.html")).unwrap();
    assert!(page.contains("<strong>18</strong>"));
    assert!(!page.contains("Maintained tags"));
    assert!(page.contains("16"));
}
