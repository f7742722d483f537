//! File types
//!
//! `lastKnownFileType` values of file references. Values outside the known
//! set are carried verbatim in [`FileType::Other`] so they survive encoding.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// Uniform type identifier of a referenced file
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FileType {
    /// `sourcecode.c.h`
    SourceCodeHeader,
    /// `sourcecode.c.c`
    SourceCodeC,
    /// `sourcecode.c.objc`
    SourceCodeObjC,
    /// `sourcecode.cpp.objcpp`
    SourceCodeObjCPlusPlus,
    /// `sourcecode.cpp.cpp`
    SourceCodeCPlusPlus,
    /// `sourcecode.swift`
    SourceCodeSwift,
    /// `sourcecode.text-based-dylib-definition`
    SystemLibrary,
    /// `wrapper.framework`
    Framework,
    /// `wrapper.cfbundle`
    Bundle,
    /// `wrapper.application`
    Application,
    /// `wrapper.pb-project`
    XcodeProject,
    /// `wrapper.xcdatamodel`
    XcDataModel,
    /// `wrapper.xcconfig`
    WrapperConfig,
    /// `archive.ar`
    Archive,
    /// `folder`
    Folder,
    /// `folder.assetcatalog`
    AssetCatalog,
    /// `file.xib`
    Xib,
    /// `file.storyboard`
    Storyboard,
    /// `file.playground`
    Playground,
    /// `file.strings`
    LocalizableStrings,
    /// `image.png`
    ImagePng,
    /// `text`
    Text,
    /// `text.html`
    Html,
    /// `text.plist.strings`
    PropertyListStrings,
    /// `text.plist.xml`
    XmlPropertyList,
    /// `text.script.sh`
    ShellScript,
    /// `text.xcconfig`
    TextConfig,
    /// `net.daringfireball.markdown`
    Markdown,
    /// Any other type identifier, kept as written
    Other(String),
}

const KNOWN: [(FileType, &str); 28] = [
    (FileType::SourceCodeHeader, "sourcecode.c.h"),
    (FileType::SourceCodeC, "sourcecode.c.c"),
    (FileType::SourceCodeObjC, "sourcecode.c.objc"),
    (FileType::SourceCodeObjCPlusPlus, "sourcecode.cpp.objcpp"),
    (FileType::SourceCodeCPlusPlus, "sourcecode.cpp.cpp"),
    (FileType::SourceCodeSwift, "sourcecode.swift"),
    (FileType::SystemLibrary, "sourcecode.text-based-dylib-definition"),
    (FileType::Framework, "wrapper.framework"),
    (FileType::Bundle, "wrapper.cfbundle"),
    (FileType::Application, "wrapper.application"),
    (FileType::XcodeProject, "wrapper.pb-project"),
    (FileType::XcDataModel, "wrapper.xcdatamodel"),
    (FileType::WrapperConfig, "wrapper.xcconfig"),
    (FileType::Archive, "archive.ar"),
    (FileType::Folder, "folder"),
    (FileType::AssetCatalog, "folder.assetcatalog"),
    (FileType::Xib, "file.xib"),
    (FileType::Storyboard, "file.storyboard"),
    (FileType::Playground, "file.playground"),
    (FileType::LocalizableStrings, "file.strings"),
    (FileType::ImagePng, "image.png"),
    (FileType::Text, "text"),
    (FileType::Html, "text.html"),
    (FileType::PropertyListStrings, "text.plist.strings"),
    (FileType::XmlPropertyList, "text.plist.xml"),
    (FileType::ShellScript, "text.script.sh"),
    (FileType::TextConfig, "text.xcconfig"),
    (FileType::Markdown, "net.daringfireball.markdown"),
];

const EXTENSIONS: [(&str, FileType); 24] = [
    ("h", FileType::SourceCodeHeader),
    ("hh", FileType::SourceCodeHeader),
    ("hpp", FileType::SourceCodeHeader),
    ("hxx", FileType::SourceCodeHeader),
    ("c", FileType::SourceCodeC),
    ("m", FileType::SourceCodeObjC),
    ("mm", FileType::SourceCodeObjCPlusPlus),
    ("cpp", FileType::SourceCodeCPlusPlus),
    ("cc", FileType::SourceCodeCPlusPlus),
    ("swift", FileType::SourceCodeSwift),
    ("tbd", FileType::SystemLibrary),
    ("framework", FileType::Framework),
    ("bundle", FileType::Bundle),
    ("app", FileType::Application),
    ("xcodeproj", FileType::XcodeProject),
    ("xcdatamodel", FileType::XcDataModel),
    ("a", FileType::Archive),
    ("xcassets", FileType::AssetCatalog),
    ("xib", FileType::Xib),
    ("storyboard", FileType::Storyboard),
    ("strings", FileType::LocalizableStrings),
    ("png", FileType::ImagePng),
    ("plist", FileType::XmlPropertyList),
    ("xcconfig", FileType::TextConfig),
];

impl FileType {
    /// Raw type identifier
    #[must_use]
    pub fn as_str(&self) -> &str {
        if let Self::Other(raw) = self {
            return raw;
        }
        KNOWN
            .iter()
            .find(|(known, _)| known == self)
            .map_or("", |(_, raw)| *raw)
    }

    /// Guess the type from a file name's extension (case-insensitive)
    #[must_use]
    pub fn from_extension(file_name: &str) -> Option<Self> {
        let (_, ext) = file_name.rsplit_once('.')?;
        let ext = ext.to_ascii_lowercase();
        EXTENSIONS
            .iter()
            .find(|(known, _)| *known == ext)
            .map(|(_, file_type)| file_type.clone())
    }

    /// True for source files compiled by a Sources phase
    #[must_use]
    pub fn is_source_code(&self) -> bool {
        matches!(
            self,
            Self::SourceCodeC
                | Self::SourceCodeObjC
                | Self::SourceCodeObjCPlusPlus
                | Self::SourceCodeCPlusPlus
                | Self::SourceCodeSwift
        )
    }
}

impl Display for FileType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FileType {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(KNOWN
            .iter()
            .find(|(_, raw)| *raw == s)
            .map_or_else(|| Self::Other(s.to_string()), |(known, _)| known.clone()))
    }
}

impl From<&str> for FileType {
    fn from(value: &str) -> Self {
        match value.parse() {
            Ok(file_type) => file_type,
            Err(never) => match never {},
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_types_round_trip() {
        for (file_type, raw) in &KNOWN {
            assert_eq!(file_type.as_str(), *raw);
            assert_eq!(FileType::from(*raw), *file_type);
        }
    }

    #[test]
    fn unknown_types_pass_through() {
        let file_type = FileType::from("sourcecode.metal");
        assert_eq!(file_type, FileType::Other("sourcecode.metal".into()));
        assert_eq!(file_type.to_string(), "sourcecode.metal");
    }

    #[test]
    fn extension_lookup() {
        assert_eq!(FileType::from_extension("main.c"), Some(FileType::SourceCodeC));
        assert_eq!(FileType::from_extension("View.SWIFT"), Some(FileType::SourceCodeSwift));
        assert_eq!(FileType::from_extension("UIKit.framework"), Some(FileType::Framework));
        assert_eq!(FileType::from_extension("README"), None);
        assert_eq!(FileType::from_extension("notes.txt"), None);
        assert!(FileType::SourceCodeSwift.is_source_code());
        assert!(!FileType::SourceCodeHeader.is_source_code());
    }
}
