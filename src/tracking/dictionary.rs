//! 标记字典目录
//!
//! `-d` 参数既可以是已知字典名, 也可以是自定义字典文件路径.

use phf::phf_map;
use std::fmt;
use std::path::PathBuf;

/// 默认: 所有字典
pub const DEFAULT_DICTIONARY: &str = "ALL_DICTS";

/// 已知字典, 按显示顺序
pub static DICTIONARIES: [&str; 12] = [
    "ALL_DICTS",
    "ARUCO",
    "ARUCO_MIP_16h3",
    "ARUCO_MIP_25h7",
    "ARUCO_MIP_36h12",
    "ARTOOLKITPLUS",
    "ARTOOLKITPLUSBCH",
    "TAG16h5",
    "TAG25h9",
    "TAG36h10",
    "TAG36h11",
    "CHILITAGS",
];

/// 字典名 → 标记位数 (ALL_DICTS 为 0)
static DICTIONARY_BITS: phf::Map<&'static str, u32> = phf_map! {
    "ALL_DICTS" => 0,
    "ARUCO" => 25,
    "ARUCO_MIP_16h3" => 16,
    "ARUCO_MIP_25h7" => 25,
    "ARUCO_MIP_36h12" => 36,
    "ARTOOLKITPLUS" => 36,
    "ARTOOLKITPLUSBCH" => 36,
    "TAG16h5" => 16,
    "TAG25h9" => 25,
    "TAG36h10" => 36,
    "TAG36h11" => 36,
    "CHILITAGS" => 36,
};

/// 已知字典
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Dictionary {
    name: &'static str,
    bits: u32,
}

impl Dictionary {
    pub fn lookup(name: &str) -> Option<Dictionary> {
        DICTIONARY_BITS
            .get_entry(name)
            .map(|(name, bits)| Dictionary {
                name: *name,
                bits: *bits,
            })
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// 标记内部位数; ALL_DICTS 为 0
    pub fn bits(&self) -> u32 {
        self.bits
    }

    /// 标记边长格数 (内部位网格 + 两侧黑边); ALL_DICTS 为 0
    pub fn grid_cells(&self) -> u32 {
        if self.bits == 0 {
            return 0;
        }
        (self.bits as f64).sqrt().round() as u32 + 2
    }

    pub fn is_all(&self) -> bool {
        self.name == DEFAULT_DICTIONARY
    }
}

/// `-d` 参数解析结果
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DictionarySelector {
    Named(Dictionary),
    /// 自定义字典文件
    File(PathBuf),
}

impl DictionarySelector {
    pub fn parse(value: &str) -> Self {
        match Dictionary::lookup(value) {
            Some(dict) => DictionarySelector::Named(dict),
            None => DictionarySelector::File(PathBuf::from(value)),
        }
    }
}

impl Default for DictionarySelector {
    fn default() -> Self {
        DictionarySelector::parse(DEFAULT_DICTIONARY)
    }
}

impl fmt::Display for DictionarySelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DictionarySelector::Named(dict) => write!(f, "{}", dict.name()),
            DictionarySelector::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// 帮助信息中的字典列表
pub fn dictionary_list() -> String {
    DICTIONARIES.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_listed_dictionary_is_known() {
        for name in DICTIONARIES {
            assert!(Dictionary::lookup(name).is_some(), "{}", name);
        }
        assert_eq!(DICTIONARY_BITS.len(), DICTIONARIES.len());
    }

    #[test]
    fn test_parse_named_and_file() {
        match DictionarySelector::parse("TAG36h11") {
            DictionarySelector::Named(d) => {
                assert_eq!(d.name(), "TAG36h11");
                assert_eq!(d.bits(), 36);
                assert_eq!(d.grid_cells(), 8);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(
            DictionarySelector::parse("my_dict.dict"),
            DictionarySelector::File(PathBuf::from("my_dict.dict"))
        );
    }

    #[test]
    fn test_grid_cells_per_family() {
        let cells = |name| Dictionary::lookup(name).unwrap().grid_cells();
        assert_eq!(cells("ALL_DICTS"), 0);
        assert_eq!(cells("TAG16h5"), 6);
        assert_eq!(cells("ARUCO"), 7);
        assert_eq!(cells("CHILITAGS"), 8);
    }

    #[test]
    fn test_default_is_all_dicts() {
        match DictionarySelector::default() {
            DictionarySelector::Named(d) => assert!(d.is_all()),
            other => panic!("unexpected {:?}", other),
        }
        assert!(dictionary_list().starts_with("ALL_DICTS ARUCO"));
    }
}
