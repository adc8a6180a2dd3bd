// In-band administrative directives.
//
// Recognized only when the first space-separated token of a line is one of
// the keywords below (case-sensitive). Whether the sender may issue them is
// the orchestrator's call; this module only parses.
//
// Arguments are split on single spaces, so a doubled space inside the
// arguments counts as an empty argument and makes the directive malformed.
//
//   <map WORD REPLACEMENT   create or overwrite a mapping
//   <unmap WORD             remove a mapping
//   <force TEXT...          trigger on TEXT unconditionally
//   <count                  report the channel's mutation count

use crate::error::DirectiveError;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Directive {
    Map { word: String, replacement: String },
    Unmap { word: String },
    Force { text: String },
    Count,
}

impl Directive {
    /// Parse a chat line. `None` means the line is not a directive at all.
    pub fn parse(line: &str) -> Option<Result<Directive, DirectiveError>> {
        let line = line.trim();
        let (keyword, rest) = line.split_once(' ').unwrap_or((line, ""));
        let args: Vec<&str> = if rest.is_empty() {
            Vec::new()
        } else {
            rest.split(' ').collect()
        };

        let parsed = match keyword {
            "<map" => expect_args("<map", &args, 2).map(|()| Directive::Map {
                word: args[0].to_string(),
                replacement: args[1].to_string(),
            }),
            "<unmap" => expect_args("<unmap", &args, 1).map(|()| Directive::Unmap {
                word: args[0].to_string(),
            }),
            "<force" => {
                let text = rest.trim();
                if text.is_empty() {
                    Err(DirectiveError::Malformed {
                        directive: "<force",
                        expected: 1,
                        found: 0,
                    })
                } else {
                    Ok(Directive::Force {
                        text: text.to_string(),
                    })
                }
            }
            "<count" => expect_args("<count", &args, 0).map(|()| Directive::Count),
            _ => return None,
        };
        Some(parsed)
    }
}

fn expect_args(directive: &'static str, args: &[&str], expected: usize) -> Result<(), DirectiveError> {
    if args.len() == expected {
        Ok(())
    } else {
        Err(DirectiveError::Malformed {
            directive,
            expected,
            found: args.len(),
        })
    }
}
