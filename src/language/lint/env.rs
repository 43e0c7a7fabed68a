use std::rc::Rc;

/// Persistent scope chain of variable and function bindings. Every `bind_*`
/// operation returns a new environment sharing its tail with the old one;
/// lookups walk from the innermost binding outward, so the newest binding of
/// a name shadows older ones. Variables and functions are separate
/// namespaces.
#[derive(Clone, Debug, Default)]
pub struct Env {
    head: Option<Rc<Frame>>,
}

#[derive(Debug)]
struct Frame {
    binding: Binding,
    next: Option<Rc<Frame>>,
}

#[derive(Debug)]
enum Binding {
    Variable(String),
    Function(String, usize),
    Import {
        local: String,
        arity: usize,
        module: String,
        remote: String,
    },
}

impl Env {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_variable_bound(&self, name: &str) -> bool {
        self.frames()
            .any(|frame| matches!(&frame.binding, Binding::Variable(v) if v == name))
    }

    pub fn is_function_bound(&self, name: &str, arity: usize) -> bool {
        self.frames().any(|frame| match &frame.binding {
            Binding::Function(f, a) => f == name && *a == arity,
            Binding::Import { local, arity: a, .. } => local == name && *a == arity,
            Binding::Variable(_) => false,
        })
    }

    /// Module and remote name behind an import binding, if `name`/`arity`
    /// resolves to one.
    pub fn imported_from(&self, name: &str, arity: usize) -> Option<(&str, &str)> {
        self.frames().find_map(|frame| match &frame.binding {
            Binding::Import {
                local,
                arity: a,
                module,
                remote,
            } if local == name && *a == arity => Some((module.as_str(), remote.as_str())),
            _ => None,
        })
    }

    pub fn bind_variable(&self, name: &str) -> Env {
        self.push(Binding::Variable(name.to_string()))
    }

    pub fn bind_variables<I, S>(&self, names: I) -> Env
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut env = self.clone();
        for name in names {
            env = env.bind_variable(name.as_ref());
        }
        env
    }

    pub fn bind_function(&self, name: &str, arity: usize) -> Env {
        self.push(Binding::Function(name.to_string(), arity))
    }

    pub fn bind_import(&self, module: &str, remote: &str, arity: usize, alias: &str) -> Env {
        self.push(Binding::Import {
            local: alias.to_string(),
            arity,
            module: module.to_string(),
            remote: remote.to_string(),
        })
    }

    fn push(&self, binding: Binding) -> Env {
        Env {
            head: Some(Rc::new(Frame {
                binding,
                next: self.head.clone(),
            })),
        }
    }

    fn frames(&self) -> Frames<'_> {
        Frames {
            next: self.head.as_deref(),
        }
    }
}

struct Frames<'a> {
    next: Option<&'a Frame>,
}

impl<'a> Iterator for Frames<'a> {
    type Item = &'a Frame;

    fn next(&mut self) -> Option<&'a Frame> {
        let frame = self.next?;
        self.next = frame.next.as_deref();
        Some(frame)
    }
}
