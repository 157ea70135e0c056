use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DescriptorError {
    #[error("method descriptor must start with '(', got {0:?}")]
    MissingParams(String),
    #[error("unexpected end of descriptor {0:?}")]
    UnexpectedEnd(String),
    #[error("unknown type tag {tag:?} at {offset} in {desc:?}")]
    UnknownTag { desc: String, offset: usize, tag: char },
    #[error("trailing data after return type in {0:?}")]
    Trailing(String),
    #[error("argument {index} out of range, method has {count}")]
    ArgumentOutOfRange { index: usize, count: usize },
}

type Result<T> = std::result::Result<T, DescriptorError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldType {
    Boolean,
    Byte,
    Char,
    Short,
    Int,
    Float,
    Long,
    Double,
    Void,
    Object(String),
    Array(Box<FieldType>),
}

impl FieldType {
    /// Local variable slots taken by a value of this type.
    pub fn slot_width(&self) -> usize {
        match self {
            FieldType::Long | FieldType::Double => 2,
            FieldType::Void => 0,
            _ => 1,
        }
    }

    pub fn is_object(&self, internal_name: &str) -> bool {
        matches!(self, FieldType::Object(n) if n == internal_name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodDescriptor {
    pub args: Vec<FieldType>,
    pub ret: FieldType,
}

impl MethodDescriptor {
    pub fn parse(desc: &str) -> Result<Self> {
        let mut parser = Parser { desc, pos: 0 };
        parser.parse_method()
    }

    /// Local variable slot holding argument `index`, counting the receiver for instance methods.
    pub fn argument_slot(&self, index: usize, is_static: bool) -> Result<usize> {
        if index >= self.args.len() {
            return Err(DescriptorError::ArgumentOutOfRange {
                index,
                count: self.args.len(),
            })
        }
        let receiver = if is_static { 0 } else { 1 };
        Ok(receiver + self.args[..index].iter().map(FieldType::slot_width).sum::<usize>())
    }
}

struct Parser<'a> {
    desc: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn parse_method(&mut self) -> Result<MethodDescriptor> {
        if self.next()? != '(' {
            return Err(DescriptorError::MissingParams(self.desc.to_owned()))
        }

        let mut args = Vec::new();
        while self.peek()? != ')' {
            args.push(self.parse_field()?);
        }
        self.pos += 1;

        let ret = if self.peek()? == 'V' {
            self.pos += 1;
            FieldType::Void
        } else {
            self.parse_field()?
        };

        if self.pos != self.desc.len() {
            return Err(DescriptorError::Trailing(self.desc.to_owned()))
        }

        Ok(MethodDescriptor { args, ret })
    }

    fn parse_field(&mut self) -> Result<FieldType> {
        let offset = self.pos;
        let ty = match self.next()? {
            'Z' => FieldType::Boolean,
            'B' => FieldType::Byte,
            'C' => FieldType::Char,
            'S' => FieldType::Short,
            'I' => FieldType::Int,
            'F' => FieldType::Float,
            'J' => FieldType::Long,
            'D' => FieldType::Double,
            '[' => FieldType::Array(Box::new(self.parse_field()?)),
            'L' => {
                let rest = &self.desc[self.pos..];
                let end = rest.find(';').ok_or_else(|| DescriptorError::UnexpectedEnd(self.desc.to_owned()))?;
                self.pos += end + 1;
                FieldType::Object(rest[..end].to_owned())
            },
            tag => {
                return Err(DescriptorError::UnknownTag {
                    desc: self.desc.to_owned(),
                    offset,
                    tag,
                })
            },
        };
        Ok(ty)
    }

    fn peek(&self) -> Result<char> {
        self.desc[self.pos..]
            .chars()
            .next()
            .ok_or_else(|| DescriptorError::UnexpectedEnd(self.desc.to_owned()))
    }

    fn next(&mut self) -> Result<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Ok(c)
    }
}
