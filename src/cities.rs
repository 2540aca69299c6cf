//! City-name normalization.
//!
//! OpenWeatherMap resolves city names given in English; the dashboard's
//! audience types them in Chinese. A curated table maps the major cities to
//! the provider-recognized spelling. Input that is not in the table is passed
//! through unchanged; the provider may or may not understand it, and the 404
//! path reports both names when it does not.

use std::collections::HashMap;
use std::sync::LazyLock;

/// Curated display-name → provider-name table. Read-only for the process
/// lifetime.
static CITY_NAMES: LazyLock<HashMap<&'static str, &'static str>> = LazyLock::new(|| {
    HashMap::from([
        ("北京", "Beijing"),
        ("上海", "Shanghai"),
        ("广州", "Guangzhou"),
        ("深圳", "Shenzhen"),
        ("杭州", "Hangzhou"),
        ("成都", "Chengdu"),
        ("重庆", "Chongqing"),
        ("西安", "Xi'an"),
        ("南京", "Nanjing"),
        ("武汉", "Wuhan"),
        ("天津", "Tianjin"),
        ("苏州", "Suzhou"),
        ("长沙", "Changsha"),
        ("郑州", "Zhengzhou"),
        ("东莞", "Dongguan"),
        ("青岛", "Qingdao"),
        ("沈阳", "Shenyang"),
        ("宁波", "Ningbo"),
        ("昆明", "Kunming"),
        ("大连", "Dalian"),
        ("厦门", "Xiamen"),
        ("合肥", "Hefei"),
        ("佛山", "Foshan"),
        ("福州", "Fuzhou"),
        ("哈尔滨", "Harbin"),
        ("济南", "Jinan"),
        ("温州", "Wenzhou"),
        ("石家庄", "Shijiazhuang"),
        ("泉州", "Quanzhou"),
        ("长春", "Changchun"),
        ("贵阳", "Guiyang"),
        ("南昌", "Nanchang"),
        ("伦敦", "London"),
        ("纽约", "New York"),
        ("东京", "Tokyo"),
        ("巴黎", "Paris"),
        ("悉尼", "Sydney"),
        ("新加坡", "Singapore"),
        ("首尔", "Seoul"),
        ("曼谷", "Bangkok"),
    ])
});

/// Resolve the name to send upstream. Identity for anything not in the table.
#[must_use]
pub fn provider_name(requested: &str) -> &str {
    CITY_NAMES.get(requested).copied().unwrap_or(requested)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn curated_names_resolve_to_provider_spelling() {
        assert_eq!(provider_name("北京"), "Beijing");
        assert_eq!(provider_name("深圳"), "Shenzhen");
        assert_eq!(provider_name("西安"), "Xi'an");
        assert_eq!(provider_name("纽约"), "New York");
    }

    #[test]
    fn unknown_input_passes_through_unchanged() {
        assert_eq!(provider_name("Atlantis"), "Atlantis");
        assert_eq!(provider_name("Berlin"), "Berlin");
        assert_eq!(provider_name("亚特兰蒂斯"), "亚特兰蒂斯");
    }

    #[test]
    fn provider_format_input_is_identity() {
        // already-English names of curated cities are not re-mapped
        assert_eq!(provider_name("Beijing"), "Beijing");
    }

    #[test]
    fn table_is_complete_and_ascii_bound() {
        assert_eq!(CITY_NAMES.len(), 40);
        for (display, provider) in CITY_NAMES.iter() {
            assert!(!display.is_empty());
            assert!(provider.is_ascii(), "{provider} must be provider-safe");
        }
    }
}
