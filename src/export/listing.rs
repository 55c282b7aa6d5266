//! Plain-text listing of the traversal, one directory per block

use std::io::Write;

use super::traversal::TraversalObserver;
use crate::error::DavError;
use crate::models::Resource;

/// Prints each visited directory followed by its children, indented.
pub struct ListingPrinter<W: Write> {
    out: W,
}

impl<W: Write> ListingPrinter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> TraversalObserver for ListingPrinter<W> {
    fn directory_listed(&mut self, path: &str, children: &[Resource]) -> Result<(), DavError> {
        writeln!(self.out, "{}", path)?;
        for child in children {
            writeln!(self.out, "  {}", child.relative_path)?;
        }
        Ok(())
    }

    fn resource_resolved(&mut self, _resource: Resource) -> Result<(), DavError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    #[test]
    fn test_prints_directory_then_children() {
        let children = vec![
            Resource::new(Url::parse("https://h/docs/a.txt").unwrap(), "a.txt"),
            Resource::new(Url::parse("https://h/docs/sub/").unwrap(), "sub/"),
        ];
        let mut printer = ListingPrinter::new(Vec::new());
        printer.directory_listed("/docs", &children).unwrap();

        let output = String::from_utf8(printer.into_inner()).unwrap();
        assert_eq!(output, "/docs\n  a.txt\n  sub/\n");
    }
}
