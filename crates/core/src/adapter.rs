//! Defines the core abstraction for a navigable, read-only AST node tree.
use std::fmt;

/// The universal contract for a node in an externally-owned syntax tree.
///
/// The query engine is written exclusively against this trait, allowing it to
/// operate on any parser's tree representation that implements it. The engine
/// never mutates a node; all knowledge of the host tree is routed through
/// these five operations.
pub trait AstNode: fmt::Debug + Clone + PartialEq {
    /// The type tag of the node (e.g. `NewExpression`).
    fn node_type(&self) -> String;

    /// The source text of the node.
    fn source(&self) -> String;

    /// The child nodes, in source order. Empty for leaf nodes.
    fn children(&self) -> Vec<Self>;

    /// The nodes *after* this one among its siblings, in source order.
    /// May legitimately be empty if the backing tree has no sibling concept.
    fn siblings(&self) -> Vec<Self>;

    /// Resolves a structural field or zero-argument accessor by name.
    ///
    /// Returns `None` when the node has no such field; key-path resolution
    /// treats this as a soft failure, never an error.
    fn field(&self, name: &str) -> Option<NodeValue<Self>>;
}

/// The result of resolving a key path against a node.
///
/// Attribute values in a query are compared against one of these: a genuine
/// node, an ordered collection, a primitive, or the null sentinel produced
/// when resolution finds nothing.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeValue<N> {
    Node(N),
    Array(Vec<NodeValue<N>>),
    String(String),
    Number(f64),
    Bool(bool),
    Null,
    Undefined,
}

impl<N> NodeValue<N> {
    /// True if the value is a genuine node, or a collection of them.
    /// Primitives and the null sentinel are not nodes.
    pub fn is_node(&self) -> bool {
        match self {
            NodeValue::Node(_) => true,
            NodeValue::Array(items) => items.iter().all(|item| item.is_node()),
            _ => false,
        }
    }
}

// Test utilities - publicly available for integration testing in downstream crates
pub mod tests {
    use super::*;
    use std::collections::HashMap;

    // --- Mock Implementation for TDD ---

    /// A field value as stored in the mock tree; node references are ids.
    #[derive(Debug, Clone)]
    pub enum MockField {
        Node(usize),
        Array(Vec<MockField>),
        Str(String),
        Num(f64),
        Bool(bool),
        Null,
    }

    #[derive(Debug, Clone)]
    struct MockNodeData {
        node_type: String,
        source: String,
        children: Vec<usize>,
        fields: Vec<(String, MockField)>,
    }

    #[derive(Debug, Default)]
    pub struct MockTree {
        nodes: HashMap<usize, MockNodeData>,
        // Maps a child id back to its parent id, for sibling lookups.
        parent_map: HashMap<usize, usize>,
    }

    impl MockTree {
        pub fn insert(
            &mut self,
            id: usize,
            node_type: &str,
            source: &str,
            children: Vec<usize>,
            fields: Vec<(&str, MockField)>,
        ) {
            for child in &children {
                self.parent_map.insert(*child, id);
            }
            self.nodes.insert(
                id,
                MockNodeData {
                    node_type: node_type.to_string(),
                    source: source.to_string(),
                    children,
                    fields: fields
                        .into_iter()
                        .map(|(name, value)| (name.to_string(), value))
                        .collect(),
                },
            );
        }

        pub fn node(&self, id: usize) -> MockNode<'_> {
            MockNode { id, tree: self }
        }

        fn field_value(&self, field: &MockField) -> NodeValue<MockNode<'_>> {
            match field {
                MockField::Node(id) => NodeValue::Node(self.node(*id)),
                MockField::Array(items) => {
                    NodeValue::Array(items.iter().map(|item| self.field_value(item)).collect())
                }
                MockField::Str(s) => NodeValue::String(s.clone()),
                MockField::Num(n) => NodeValue::Number(*n),
                MockField::Bool(b) => NodeValue::Bool(*b),
                MockField::Null => NodeValue::Null,
            }
        }
    }

    /// A simple, in-memory node representation that holds a reference to its
    /// tree, so that it can navigate itself (children, siblings, fields).
    #[derive(Debug, Clone, Copy)]
    pub struct MockNode<'a> {
        pub id: usize,
        pub tree: &'a MockTree,
    }

    impl<'a> PartialEq for MockNode<'a> {
        fn eq(&self, other: &Self) -> bool {
            self.id == other.id
        }
    }

    impl<'a> AstNode for MockNode<'a> {
        fn node_type(&self) -> String {
            self.tree.nodes[&self.id].node_type.clone()
        }

        fn source(&self) -> String {
            self.tree.nodes[&self.id].source.clone()
        }

        fn children(&self) -> Vec<Self> {
            self.tree.nodes[&self.id]
                .children
                .iter()
                .map(|&id| self.tree.node(id))
                .collect()
        }

        fn siblings(&self) -> Vec<Self> {
            let Some(&parent_id) = self.tree.parent_map.get(&self.id) else {
                return vec![];
            };
            let parent_children = &self.tree.nodes[&parent_id].children;
            parent_children
                .iter()
                .skip_while(|&&id| id != self.id)
                .skip(1)
                .map(|&id| self.tree.node(id))
                .collect()
        }

        fn field(&self, name: &str) -> Option<NodeValue<Self>> {
            self.tree.nodes[&self.id]
                .fields
                .iter()
                .find(|(field_name, _)| field_name == name)
                .map(|(_, value)| self.tree.field_value(value))
        }
    }

    /// Creates a mock tree for the canonical fixture:
    ///
    /// ```text
    /// interface User {             // id 1
    ///   name: string; id: number; active: boolean;
    /// }
    /// class UserAccount {          // id 3
    ///   name: string;              // id 5
    ///   id: number;                // id 8
    ///   active: boolean;           // id 11
    ///   constructor(name, id, active) { ... }  // id 14
    ///   login() { ... }            // id 16
    ///   logout() { ... }           // id 18
    /// }
    /// const user: User = new UserAccount("Murphy", 1, true);  // id 20, NewExpression id 25
    /// ```
    pub fn create_test_tree() -> MockTree {
        let mut tree = MockTree::default();

        tree.insert(
            0,
            "SourceFile",
            "interface User { name: string; id: number; active: boolean; }\nclass UserAccount { name: string; id: number; active: boolean; constructor(name: string, id: number, active: boolean) { this.name = name; this.id = id; this.active = active; } login() { return true; } logout() { return false; } }\nconst user: User = new UserAccount(\"Murphy\", 1, true);",
            vec![1, 3, 20],
            vec![],
        );

        tree.insert(
            1,
            "InterfaceDeclaration",
            "interface User { name: string; id: number; active: boolean; }",
            vec![2],
            vec![("name", MockField::Node(2))],
        );
        tree.insert(2, "Identifier", "User", vec![], vec![("text", MockField::Str("User".into()))]);

        tree.insert(
            3,
            "ClassDeclaration",
            "class UserAccount { name: string; id: number; active: boolean; constructor(name: string, id: number, active: boolean) { this.name = name; this.id = id; this.active = active; } login() { return true; } logout() { return false; } }",
            vec![4, 5, 8, 11, 14, 16, 18],
            vec![
                ("name", MockField::Node(4)),
                (
                    "members",
                    MockField::Array(vec![
                        MockField::Node(5),
                        MockField::Node(8),
                        MockField::Node(11),
                        MockField::Node(14),
                        MockField::Node(16),
                        MockField::Node(18),
                    ]),
                ),
            ],
        );
        tree.insert(4, "Identifier", "UserAccount", vec![], vec![("text", MockField::Str("UserAccount".into()))]);

        tree.insert(
            5,
            "PropertyDeclaration",
            "name: string;",
            vec![6, 7],
            vec![("key", MockField::Node(6)), ("type", MockField::Node(7))],
        );
        tree.insert(6, "Identifier", "name", vec![], vec![("text", MockField::Str("name".into()))]);
        tree.insert(7, "StringKeyword", "string", vec![], vec![]);

        tree.insert(
            8,
            "PropertyDeclaration",
            "id: number;",
            vec![9, 10],
            vec![("key", MockField::Node(9)), ("type", MockField::Node(10))],
        );
        tree.insert(9, "Identifier", "id", vec![], vec![("text", MockField::Str("id".into()))]);
        tree.insert(10, "NumberKeyword", "number", vec![], vec![]);

        tree.insert(
            11,
            "PropertyDeclaration",
            "active: boolean;",
            vec![12, 13],
            vec![("key", MockField::Node(12)), ("type", MockField::Node(13))],
        );
        tree.insert(12, "Identifier", "active", vec![], vec![("text", MockField::Str("active".into()))]);
        tree.insert(13, "BooleanKeyword", "boolean", vec![], vec![]);

        tree.insert(
            14,
            "MethodDefinition",
            "constructor(name: string, id: number, active: boolean) { this.name = name; this.id = id; this.active = active; }",
            vec![15],
            vec![("key", MockField::Node(15))],
        );
        tree.insert(15, "Identifier", "constructor", vec![], vec![("text", MockField::Str("constructor".into()))]);

        tree.insert(
            16,
            "MethodDefinition",
            "login() { return true; }",
            vec![17],
            vec![("key", MockField::Node(17))],
        );
        tree.insert(17, "Identifier", "login", vec![], vec![("text", MockField::Str("login".into()))]);

        tree.insert(
            18,
            "MethodDefinition",
            "logout() { return false; }",
            vec![19],
            vec![("key", MockField::Node(19))],
        );
        tree.insert(19, "Identifier", "logout", vec![], vec![("text", MockField::Str("logout".into()))]);

        tree.insert(
            20,
            "VariableStatement",
            "const user: User = new UserAccount(\"Murphy\", 1, true);",
            vec![21],
            vec![],
        );
        tree.insert(
            21,
            "VariableDeclaration",
            "user: User = new UserAccount(\"Murphy\", 1, true)",
            vec![22, 23, 25],
            vec![
                ("name", MockField::Node(22)),
                ("type", MockField::Node(23)),
                ("initializer", MockField::Node(25)),
            ],
        );
        tree.insert(22, "Identifier", "user", vec![], vec![("text", MockField::Str("user".into()))]);
        tree.insert(
            23,
            "TypeReference",
            "User",
            vec![24],
            vec![("typeName", MockField::Node(24))],
        );
        tree.insert(24, "Identifier", "User", vec![], vec![("text", MockField::Str("User".into()))]);

        tree.insert(
            25,
            "NewExpression",
            "new UserAccount(\"Murphy\", 1, true)",
            vec![26, 27, 28, 29],
            vec![
                ("expression", MockField::Node(26)),
                (
                    "arguments",
                    MockField::Array(vec![
                        MockField::Node(27),
                        MockField::Node(28),
                        MockField::Node(29),
                    ]),
                ),
            ],
        );
        tree.insert(26, "Identifier", "UserAccount", vec![], vec![("text", MockField::Str("UserAccount".into()))]);
        tree.insert(
            27,
            "StringLiteral",
            "\"Murphy\"",
            vec![],
            vec![("text", MockField::Str("Murphy".into()))],
        );
        tree.insert(
            28,
            "NumericLiteral",
            "1",
            vec![],
            vec![("text", MockField::Str("1".into()))],
        );
        tree.insert(29, "TrueKeyword", "true", vec![], vec![]);

        tree
    }

    #[test]
    fn test_mock_tree_navigation() {
        let tree = create_test_tree();
        let root = tree.node(0);
        assert_eq!(root.node_type(), "SourceFile");
        assert_eq!(root.children().len(), 3);

        let class = tree.node(3);
        assert_eq!(class.node_type(), "ClassDeclaration");
        assert_eq!(class.children().len(), 7);

        // Siblings are the nodes after the constructor within the class.
        let ctor = tree.node(14);
        let siblings = ctor.siblings();
        assert_eq!(siblings.len(), 2);
        assert_eq!(siblings[0].id, 16);
        assert_eq!(siblings[1].id, 18);

        // The root has no parent, hence no siblings.
        assert!(root.siblings().is_empty());
    }

    #[test]
    fn test_mock_tree_fields() {
        let tree = create_test_tree();
        let new_expr = tree.node(25);
        match new_expr.field("arguments") {
            Some(NodeValue::Array(items)) => assert_eq!(items.len(), 3),
            other => panic!("Expected an array, got {:?}", other),
        }
        match new_expr.field("expression") {
            Some(NodeValue::Node(node)) => assert_eq!(node.source(), "UserAccount"),
            other => panic!("Expected a node, got {:?}", other),
        }
        assert!(new_expr.field("missing").is_none());
    }
}
