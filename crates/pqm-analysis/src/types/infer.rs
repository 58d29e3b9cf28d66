//! Type inference over the dual store.
//!
//! Inference is flow-insensitive and memoized per node id. In-progress
//! context nodes resolve to `unknown`; the store is frozen during
//! inspection, so a cached result can never be invalidated by a
//! context closing.

use indexmap::IndexMap;

use pqm_grammar::node::BinaryOperator;
use pqm_grammar::node::ConstantKind;
use pqm_grammar::node::LiteralKind;
use pqm_grammar::node::NodeId;
use pqm_grammar::node::NodeKind;
use pqm_grammar::node::XorNode;
use pqm_grammar::text::normalize_identifier;

use crate::inspector::Inspector;
use crate::scope::annotated_primitive;
use crate::scope::function_parameters;
use crate::scope::ScopeItem;
use crate::types::simplify;
use crate::types::FunctionParameter;
use crate::types::Type;
use crate::types::TypeKind;
use crate::types::TypeVariant;

impl Inspector<'_> {
    /// Infers the static type of a node.
    ///
    /// Results are memoized per node id; recursive bindings are broken
    /// by seeding the cache with `unknown` before descending.
    pub fn try_scope_type(&mut self, id: NodeId) -> Type {
        if let Some(ty) = self.type_by_id.get(&id) {
            return ty.clone();
        }

        self.type_by_id.insert(id, Type::unknown());
        let ty = self.infer_type(id);
        self.type_by_id.insert(id, ty.clone());
        ty
    }

    /// Computes the type of a node without consulting the cache.
    fn infer_type(&mut self, id: NodeId) -> Type {
        let node = match self.store().xor(id) {
            Some(XorNode::Ast(node)) => node,
            Some(XorNode::Context(_)) => return Type::unknown(),
            None => return Type::unknown(),
        };

        match node.kind() {
            NodeKind::LiteralExpression => literal_type(node.literal()),
            NodeKind::IdentifierExpression => self.identifier_type(id),
            NodeKind::ParenthesizedExpression => self.child_type(id, 1),
            NodeKind::ArithmeticExpression
            | NodeKind::RelationalExpression
            | NodeKind::EqualityExpression
            | NodeKind::LogicalExpression
            | NodeKind::IsExpression
            | NodeKind::AsExpression
            | NodeKind::MetadataExpression
            | NodeKind::NullCoalescingExpression => self.binary_type(id),
            NodeKind::UnaryExpression => self.unary_type(id),
            NodeKind::IfExpression => {
                let then_type = self.child_type(id, 3);
                let else_type = self.child_type(id, 5);
                simplify(vec![then_type, else_type])
            }
            NodeKind::EachExpression => {
                let body = self.child_type(id, 1);
                Type::new(TypeVariant::DefinedFunction {
                    parameters: vec![FunctionParameter::new(
                        "_",
                        false,
                        false,
                        Some(TypeKind::Any),
                    )],
                    return_type: Box::new(body),
                })
            }
            NodeKind::FunctionExpression => self.function_type(id),
            NodeKind::RecursivePrimaryExpression => self.recursive_primary_type(id, None),
            NodeKind::InvokeExpression
            | NodeKind::ItemAccessExpression
            | NodeKind::FieldSelector
            | NodeKind::FieldProjection => self.accessor_type(id),
            NodeKind::ListExpression | NodeKind::ListLiteral => self.list_type(id),
            NodeKind::RangeExpression => Type::primitive(TypeKind::List),
            NodeKind::RecordExpression | NodeKind::RecordLiteral => self.record_type(id),
            NodeKind::LetExpression => self.let_type(id),
            NodeKind::ErrorRaisingExpression | NodeKind::NotImplementedExpression => {
                Type::none_type()
            }
            NodeKind::ErrorHandlingExpression => self.error_handling_type(id),
            NodeKind::OtherwiseExpression => self.child_type(id, 1),
            NodeKind::CatchExpression => self.child_type(id, 1),
            NodeKind::TypePrimaryType => self.type_primary_type(id),
            NodeKind::PrimitiveType => node
                .primitive_type_kind()
                .map(|kind| Type::primitive(kind.into()))
                .unwrap_or_else(Type::unknown),
            NodeKind::NullablePrimitiveType => {
                let (kind, _) = nullable_primitive_parts(self.store(), id);
                kind.map(|k| Type::primitive(k).nullable())
                    .unwrap_or_else(Type::unknown)
            }
            NodeKind::AsNullablePrimitiveType => {
                let (kind, nullable) = annotated_primitive(self.store(), id);
                kind.map(|k| {
                    let ty = Type::primitive(k.into());
                    if nullable { ty.nullable() } else { ty }
                })
                .unwrap_or_else(Type::unknown)
            }
            NodeKind::Identifier | NodeKind::GeneralizedIdentifier => Type::unknown(),
            NodeKind::Constant
            | NodeKind::Csv
            | NodeKind::Parameter
            | NodeKind::ParameterList
            | NodeKind::Section
            | NodeKind::SectionMember
            | NodeKind::FieldSpecification
            | NodeKind::FieldSpecificationList
            | NodeKind::FieldTypeSpecification
            | NodeKind::AsType
            | NodeKind::IsNullablePrimitiveType
            | NodeKind::GeneralizedIdentifierPairedAnyLiteral
            | NodeKind::GeneralizedIdentifierPairedExpression
            | NodeKind::IdentifierPairedExpression => Type::not_applicable(),
            NodeKind::FunctionType
            | NodeKind::ListType
            | NodeKind::NullableType
            | NodeKind::RecordType
            | NodeKind::TableType => self.type_node_type(id),
        }
    }

    /// Gets the type of the child at the given attribute index, or
    /// `unknown` when absent.
    fn child_type(&mut self, parent: NodeId, index: u32) -> Type {
        match self.store().child_at_index(parent, index) {
            Some(child) => self.try_scope_type(child.id()),
            None => Type::unknown(),
        }
    }

    /// Resolves the type of an identifier expression through its
    /// scope.
    fn identifier_type(&mut self, id: NodeId) -> Type {
        let item = match self.resolve_identifier(id) {
            Ok(item) => item,
            Err(_) => return Type::unknown(),
        };

        match item {
            ScopeItem::LetVariable { value, .. }
            | ScopeItem::SectionMember { value, .. }
            | ScopeItem::RecordField { value, .. } => match value {
                Some(value) => self.try_scope_type(value),
                None => Type::unknown(),
            },
            ScopeItem::Parameter {
                is_nullable,
                type_kind,
                ..
            } => match type_kind {
                Some(kind) => {
                    let ty = Type::primitive(kind.into());
                    if is_nullable { ty.nullable() } else { ty }
                }
                None => Type::any().nullable(),
            },
            ScopeItem::Each { .. } => Type::any(),
            ScopeItem::Undefined { .. } => Type::unknown(),
        }
    }

    /// Infers the type of a binary expression from its operator table.
    fn binary_type(&mut self, id: NodeId) -> Type {
        let operator = self
            .store()
            .ast(id)
            .and_then(|node| node.operator());
        let Some(operator) = operator else {
            return Type::unknown();
        };

        let left = self.child_type(id, 0);
        let right = self.child_type(id, 2);

        match operator {
            BinaryOperator::Equal | BinaryOperator::NotEqual => equality_type(&left, &right),
            BinaryOperator::LessThan
            | BinaryOperator::LessThanOrEqualTo
            | BinaryOperator::GreaterThan
            | BinaryOperator::GreaterThanOrEqualTo => relational_type(&left, &right),
            BinaryOperator::And | BinaryOperator::Or => logical_type(&left, &right),
            BinaryOperator::Is => Type::logical(),
            BinaryOperator::As => right,
            BinaryOperator::Meta => left,
            BinaryOperator::NullCoalescing => simplify(vec![left, right]),
            BinaryOperator::Addition
            | BinaryOperator::Subtraction
            | BinaryOperator::Multiplication
            | BinaryOperator::Division
            | BinaryOperator::Concatenation => arithmetic_type(operator, left, right),
        }
    }

    /// Infers the type of a unary expression.
    fn unary_type(&mut self, id: NodeId) -> Type {
        let store = self.store();
        let mut has_not = false;
        let mut operand = None;
        for child in store.children(id) {
            if let Some(node) = store.ast(*child) {
                if node.constant_kind() == Some(ConstantKind::UnaryOperator(
                    pqm_grammar::node::UnaryOperator::Not,
                )) {
                    has_not = true;
                }
            }

            operand = Some(*child);
        }

        if has_not {
            return Type::logical();
        }

        let operand_type = match operand {
            Some(operand) => self.try_scope_type(operand),
            None => return Type::unknown(),
        };

        match operand_type.kind() {
            TypeKind::Number | TypeKind::Duration => {
                decay_literal(operand_type)
            }
            TypeKind::Any | TypeKind::Unknown | TypeKind::Null => operand_type,
            _ => Type::none_type(),
        }
    }

    /// Infers the type of a function expression.
    fn function_type(&mut self, id: NodeId) -> Type {
        let store = self.store();
        let parameters: Vec<FunctionParameter> = function_parameters(store, id)
            .into_iter()
            .filter_map(|item| match item {
                ScopeItem::Parameter {
                    name,
                    is_optional,
                    is_nullable,
                    type_kind,
                    ..
                } => Some(FunctionParameter::new(
                    name,
                    is_optional,
                    is_nullable,
                    type_kind.map(Into::into).or(Some(TypeKind::Any)),
                )),
                _ => None,
            })
            .collect();

        // The annotated return type wins; otherwise the body's
        // inferred type is used.
        let mut annotation = None;
        let mut body = None;
        for child in store.children(id) {
            let Some(node) = store.xor(*child) else {
                continue;
            };

            match node.kind() {
                NodeKind::AsNullablePrimitiveType => annotation = Some(*child),
                NodeKind::ParameterList | NodeKind::Constant => {}
                _ => body = Some(*child),
            }
        }

        let return_type = match annotation {
            Some(annotation) => self.try_scope_type(annotation),
            None => body
                .map(|body| self.try_scope_type(body))
                .unwrap_or_else(Type::unknown),
        };

        Type::new(TypeVariant::DefinedFunction {
            parameters,
            return_type: Box::new(return_type),
        })
    }

    /// Infers the type of a head expression with access suffixes by
    /// folding each accessor in order.
    ///
    /// When `up_to` names one of the suffixes, folding stops before
    /// applying it, yielding the callee/target type of that suffix.
    pub(crate) fn recursive_primary_type(&mut self, id: NodeId, up_to: Option<NodeId>) -> Type {
        let children: Vec<NodeId> = self.store().children(id).to_vec();
        let mut ty = match children.first() {
            Some(head) => self.try_scope_type(*head),
            None => return Type::unknown(),
        };

        for child in children.iter().skip(1) {
            if Some(*child) == up_to {
                return ty;
            }

            let kind = match self.store().xor(*child) {
                Some(node) => node.kind(),
                None => continue,
            };

            ty = match kind {
                NodeKind::InvokeExpression => apply_invoke(&ty),
                NodeKind::ItemAccessExpression => apply_item_access(&ty),
                NodeKind::FieldSelector => {
                    let name = field_selector_name(self.store(), *child);
                    let optional = has_question_mark(self.store(), *child);
                    apply_field_selector(&ty, name.as_deref(), optional)
                }
                NodeKind::FieldProjection => {
                    let names = projection_names(self.store(), *child);
                    apply_field_projection(&ty, &names)
                }
                _ => ty,
            };
        }

        ty
    }

    /// Infers the type of an access suffix asked about directly, by
    /// folding its enclosing chain up to and through it.
    fn accessor_type(&mut self, id: NodeId) -> Type {
        let Some(parent) = self.store().parent_of(id) else {
            // An implicit-target selector or projection (sugar for a
            // function over `_`) has no statically known result.
            return Type::any();
        };

        let parent_kind = self.store().xor(parent).map(|node| node.kind());
        if parent_kind != Some(NodeKind::RecursivePrimaryExpression) {
            return Type::any();
        }

        let target = self.recursive_primary_type(parent, Some(id));
        let kind = match self.store().xor(id) {
            Some(node) => node.kind(),
            None => return Type::unknown(),
        };

        match kind {
            NodeKind::InvokeExpression => apply_invoke(&target),
            NodeKind::ItemAccessExpression => apply_item_access(&target),
            NodeKind::FieldSelector => {
                let name = field_selector_name(self.store(), id);
                let optional = has_question_mark(self.store(), id);
                apply_field_selector(&target, name.as_deref(), optional)
            }
            NodeKind::FieldProjection => {
                let names = projection_names(self.store(), id);
                apply_field_projection(&target, &names)
            }
            _ => Type::unknown(),
        }
    }

    /// Infers the type of a list expression.
    fn list_type(&mut self, id: NodeId) -> Type {
        let items: Vec<NodeId> = self
            .store()
            .csv_items(id)
            .iter()
            .map(|item| item.id())
            .collect();

        let has_range = items.iter().any(|item| {
            self.store()
                .xor(*item)
                .map(|node| node.kind() == NodeKind::RangeExpression)
                .unwrap_or(false)
        });
        if has_range {
            return Type::primitive(TypeKind::List);
        }

        let types = items
            .into_iter()
            .map(|item| self.try_scope_type(item))
            .collect();
        Type::new(TypeVariant::DefinedList(types))
    }

    /// Infers the type of a record expression.
    fn record_type(&mut self, id: NodeId) -> Type {
        let pairs: Vec<NodeId> = self
            .store()
            .csv_items(id)
            .iter()
            .map(|item| item.id())
            .collect();

        let mut fields = IndexMap::new();
        for pair in pairs {
            let key = self
                .store()
                .child_at_index(pair, 0)
                .and_then(|key| key.as_ast().and_then(|n| n.identifier_text().map(String::from)));
            let Some(key) = key else {
                continue;
            };

            let value = self.store().child_at_index(pair, 2).map(|v| v.id());
            let value_type = match value {
                Some(value) => self.try_scope_type(value),
                None => Type::unknown(),
            };
            fields.insert(normalize_identifier(&key).to_string(), value_type);
        }

        Type::new(TypeVariant::DefinedRecord {
            fields,
            is_open: false,
        })
    }

    /// Infers the type of a `let` expression: the type of its `in`
    /// expression.
    fn let_type(&mut self, id: NodeId) -> Type {
        let store = self.store();
        let body = store.children(id).iter().copied().rev().find(|child| {
            store
                .xor(*child)
                .map(|node| !matches!(node.kind(), NodeKind::Constant | NodeKind::Csv))
                .unwrap_or(false)
        });

        match body {
            Some(body) => self.try_scope_type(body),
            None => Type::unknown(),
        }
    }

    /// Infers the type of a `try` expression.
    fn error_handling_type(&mut self, id: NodeId) -> Type {
        let protected = self.child_type(id, 1);
        let handler = self.store().child_at_index(id, 2).map(|h| (h.id(), h.kind()));

        match handler {
            Some((handler, NodeKind::OtherwiseExpression)) => {
                let fallback = self.child_type(handler, 1);
                simplify(vec![protected, fallback])
            }
            Some((handler, NodeKind::CatchExpression)) => {
                let function = self.child_type(handler, 1);
                let result = apply_invoke(&function);
                simplify(vec![protected, result])
            }
            _ => simplify(vec![protected, Type::primitive(TypeKind::Record)]),
        }
    }

    /// Infers the type of a `type` expression over a primary type.
    fn type_primary_type(&mut self, id: NodeId) -> Type {
        match self.store().child_at_index(id, 1) {
            Some(child) => self.type_node_type(child.id()),
            None => Type::unknown(),
        }
    }

    /// Converts a parsed type node into a type-domain value.
    fn type_node_type(&mut self, id: NodeId) -> Type {
        let node = match self.store().xor(id) {
            Some(XorNode::Ast(node)) => node,
            _ => return Type::unknown(),
        };

        match node.kind() {
            NodeKind::PrimitiveType => node
                .primitive_type_kind()
                .map(|kind| Type::new(TypeVariant::PrimaryPrimitiveType(kind.into())))
                .unwrap_or_else(Type::unknown),
            NodeKind::NullableType => match self.store().child_at_index(id, 1) {
                Some(inner) => self.type_node_type(inner.id()).nullable(),
                None => Type::unknown(),
            },
            NodeKind::ListType => match self.store().child_at_index(id, 1) {
                Some(item) => {
                    let item = self.type_node_type(item.id());
                    Type::new(TypeVariant::ListType(Box::new(item)))
                }
                None => Type::unknown(),
            },
            NodeKind::RecordType => {
                let (fields, is_open) = self.field_specifications(id);
                Type::new(TypeVariant::RecordType { fields, is_open })
            }
            NodeKind::TableType => {
                let has_field_list = self.store().children(id).iter().any(|child| {
                    self.store()
                        .xor(*child)
                        .map(|n| n.kind() == NodeKind::FieldSpecificationList)
                        .unwrap_or(false)
                });
                if has_field_list {
                    let (fields, is_open) = self.field_specifications(id);
                    Type::new(TypeVariant::TableType { fields, is_open })
                } else {
                    Type::new(TypeVariant::TableTypePrimaryExpression)
                }
            }
            NodeKind::FunctionType => self.function_type_node(id),
            _ => Type::unknown(),
        }
    }

    /// Extracts the field specifications beneath a record or table
    /// type node.
    fn field_specifications(&mut self, id: NodeId) -> (IndexMap<String, Type>, bool) {
        let store = self.store();
        let list = store.children(id).iter().copied().find(|child| {
            store
                .xor(*child)
                .map(|n| n.kind() == NodeKind::FieldSpecificationList)
                .unwrap_or(false)
        });

        let Some(list) = list else {
            return (IndexMap::new(), false);
        };

        let is_open = store.children(list).iter().any(|child| {
            store
                .ast(*child)
                .map(|n| n.constant_kind() == Some(ConstantKind::Ellipsis))
                .unwrap_or(false)
        });

        let specs: Vec<NodeId> = store.csv_items(list).iter().map(|s| s.id()).collect();
        let mut fields = IndexMap::new();
        for spec in specs {
            let store = self.store();
            let mut name = None;
            let mut type_spec = None;
            for child in store.children(spec) {
                if let Some(node) = store.ast(*child) {
                    if node.kind() == NodeKind::GeneralizedIdentifier {
                        name = node.identifier_text().map(String::from);
                    }
                    if node.kind() == NodeKind::FieldTypeSpecification {
                        type_spec = store.child_at_index(node.id(), 1).map(|t| t.id());
                    }
                }
            }

            let Some(name) = name else {
                continue;
            };

            let field_type = match type_spec {
                Some(type_spec) => self.type_node_type(type_spec),
                None => Type::any(),
            };
            fields.insert(normalize_identifier(&name).to_string(), field_type);
        }

        (fields, is_open)
    }

    /// Converts a function type node into a type-domain value.
    fn function_type_node(&mut self, id: NodeId) -> Type {
        let store = self.store();
        let parameters: Vec<FunctionParameter> = store
            .children(id)
            .iter()
            .copied()
            .find(|child| {
                store
                    .xor(*child)
                    .map(|n| n.kind() == NodeKind::ParameterList)
                    .unwrap_or(false)
            })
            .map(|list| {
                store
                    .csv_items(list)
                    .iter()
                    .filter_map(|p| {
                        crate::scope::parameter_scope_item(store, p.id()).and_then(|item| {
                            match item {
                                ScopeItem::Parameter {
                                    name,
                                    is_optional,
                                    is_nullable,
                                    type_kind,
                                    ..
                                } => Some(FunctionParameter::new(
                                    name,
                                    is_optional,
                                    is_nullable,
                                    type_kind.map(Into::into).or(Some(TypeKind::Any)),
                                )),
                                _ => None,
                            }
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();

        let return_node = store.children(id).iter().copied().find(|child| {
            store
                .xor(*child)
                .map(|n| n.kind() == NodeKind::AsType)
                .unwrap_or(false)
        });
        let return_type = match return_node {
            Some(as_type) => match self.store().child_at_index(as_type, 1) {
                Some(inner) => self.type_node_type(inner.id()),
                None => Type::unknown(),
            },
            None => Type::unknown(),
        };

        Type::new(TypeVariant::FunctionType {
            parameters,
            return_type: Box::new(return_type),
        })
    }
}

/// Extracts the primitive kind of a `nullable` primitive type node.
fn nullable_primitive_parts(
    store: &pqm_grammar::store::NodeStore,
    id: NodeId,
) -> (Option<TypeKind>, bool) {
    let kind = store
        .children(id)
        .iter()
        .filter_map(|child| store.ast(*child))
        .find_map(|node| node.primitive_type_kind())
        .map(Into::into);
    (kind, true)
}

/// Gets the type of a literal terminal: the primitive of the
/// literal's kind, with the null literal as the `null` primitive.
fn literal_type(literal: Option<(LiteralKind, &str)>) -> Type {
    match literal {
        Some((LiteralKind::Numeric, _)) => Type::primitive(TypeKind::Number),
        Some((LiteralKind::Text, _)) => Type::primitive(TypeKind::Text),
        Some((LiteralKind::Logical, _)) => Type::logical(),
        Some((LiteralKind::Null, _)) => Type::null(),
        None => Type::unknown(),
    }
}

/// Reduces a literal refinement to its primitive.
fn decay_literal(ty: Type) -> Type {
    match ty.variant() {
        TypeVariant::NumberLiteral(_)
        | TypeVariant::TextLiteral(_)
        | TypeVariant::LogicalLiteral(_) => {
            let primitive = Type::primitive(ty.kind());
            if ty.is_nullable() {
                primitive.nullable()
            } else {
                primitive
            }
        }
        _ => ty,
    }
}

/// The result of invoking a value of the given type.
fn apply_invoke(target: &Type) -> Type {
    match target.variant() {
        TypeVariant::DefinedFunction { return_type, .. }
        | TypeVariant::FunctionType { return_type, .. } => (**return_type).clone(),
        _ => Type::any(),
    }
}

/// The result of item access on a value of the given type.
fn apply_item_access(target: &Type) -> Type {
    match target.variant() {
        TypeVariant::DefinedList(items) => simplify(items.clone()),
        TypeVariant::DefinedTable { fields, is_open } => Type::new(TypeVariant::DefinedRecord {
            fields: fields.clone(),
            is_open: *is_open,
        }),
        TypeVariant::Primitive(TypeKind::Table) => Type::primitive(TypeKind::Record),
        _ => Type::any(),
    }
}

/// The result of selecting a field from a value of the given type.
fn apply_field_selector(target: &Type, name: Option<&str>, optional: bool) -> Type {
    let Some(name) = name else {
        return Type::unknown();
    };

    match target.variant() {
        TypeVariant::DefinedRecord { fields, is_open }
        | TypeVariant::RecordType { fields, is_open } => match fields.get(name) {
            Some(field) => field.clone(),
            None if *is_open => Type::any(),
            None if optional => Type::null(),
            None => Type::none_type(),
        },
        TypeVariant::DefinedTable { .. } | TypeVariant::Primitive(TypeKind::Table) => {
            Type::primitive(TypeKind::List)
        }
        _ => Type::any(),
    }
}

/// The result of projecting fields out of a value of the given type.
fn apply_field_projection(target: &Type, names: &[String]) -> Type {
    match target.variant() {
        TypeVariant::DefinedRecord { fields, is_open } => {
            let mut projected = IndexMap::new();
            for name in names {
                match fields.get(name) {
                    Some(field) => {
                        projected.insert(name.clone(), field.clone());
                    }
                    None if *is_open => {
                        projected.insert(name.clone(), Type::any());
                    }
                    None => return Type::none_type(),
                }
            }

            Type::new(TypeVariant::DefinedRecord {
                fields: projected,
                is_open: false,
            })
        }
        _ => Type::primitive(TypeKind::Record),
    }
}

/// Extracts the selected field name of a field selector.
pub(crate) fn field_selector_name(
    store: &pqm_grammar::store::NodeStore,
    selector: NodeId,
) -> Option<String> {
    store
        .children(selector)
        .iter()
        .filter_map(|child| store.ast(*child))
        .find(|node| node.kind() == NodeKind::GeneralizedIdentifier)
        .and_then(|node| node.identifier_text())
        .map(|text| normalize_identifier(text).to_string())
}

/// Determines if an access suffix carries the optional `?` marker.
fn has_question_mark(store: &pqm_grammar::store::NodeStore, id: NodeId) -> bool {
    store
        .children(id)
        .iter()
        .filter_map(|child| store.ast(*child))
        .any(|node| node.constant_kind() == Some(ConstantKind::QuestionMark))
}

/// Extracts the selected field names of a field projection.
fn projection_names(store: &pqm_grammar::store::NodeStore, projection: NodeId) -> Vec<String> {
    store
        .csv_items(projection)
        .iter()
        .filter_map(|selector| field_selector_name(store, selector.id()))
        .collect()
}

/// The type of an equality comparison.
fn equality_type(left: &Type, right: &Type) -> Type {
    if left.kind() == TypeKind::None || right.kind() == TypeKind::None {
        return Type::none_type();
    }

    Type::logical()
}

/// The comparable kinds of a relational comparison.
const COMPARABLE_KINDS: &[TypeKind] = &[
    TypeKind::Number,
    TypeKind::Text,
    TypeKind::Date,
    TypeKind::DateTime,
    TypeKind::DateTimeZone,
    TypeKind::Duration,
    TypeKind::Time,
];

/// The type of a relational comparison.
fn relational_type(left: &Type, right: &Type) -> Type {
    let (l, r) = (left.kind(), right.kind());
    if l == TypeKind::Unknown || r == TypeKind::Unknown {
        return Type::unknown();
    }

    let comparable = |k: TypeKind| {
        k == TypeKind::Any || k == TypeKind::Null || COMPARABLE_KINDS.contains(&k)
    };
    if comparable(l) && comparable(r) {
        Type::logical()
    } else {
        Type::none_type()
    }
}

/// The type of an `and` / `or` expression.
fn logical_type(left: &Type, right: &Type) -> Type {
    let (l, r) = (left.kind(), right.kind());
    if l == TypeKind::Unknown || r == TypeKind::Unknown {
        return Type::unknown();
    }

    let admissible = |k: TypeKind| matches!(k, TypeKind::Logical | TypeKind::Any | TypeKind::Null);
    if admissible(l) && admissible(r) {
        Type::logical()
    } else {
        Type::none_type()
    }
}

/// The result kind of an arithmetic operator over two operand kinds.
fn arithmetic_kind(left: TypeKind, operator: BinaryOperator, right: TypeKind) -> Option<TypeKind> {
    use TypeKind::*;

    match operator {
        BinaryOperator::Addition => match (left, right) {
            (Number, Number) => Some(Number),
            (Date, Duration) | (Duration, Date) => Some(Date),
            (DateTime, Duration) | (Duration, DateTime) => Some(DateTime),
            (DateTimeZone, Duration) | (Duration, DateTimeZone) => Some(DateTimeZone),
            (Time, Duration) | (Duration, Time) => Some(Time),
            (Duration, Duration) => Some(Duration),
            _ => Option::None,
        },
        BinaryOperator::Subtraction => match (left, right) {
            (Number, Number) => Some(Number),
            (Date, Date) => Some(Duration),
            (DateTime, DateTime) => Some(Duration),
            (DateTimeZone, DateTimeZone) => Some(Duration),
            (Time, Time) => Some(Duration),
            (Date, Duration) => Some(Date),
            (DateTime, Duration) => Some(DateTime),
            (DateTimeZone, Duration) => Some(DateTimeZone),
            (Time, Duration) => Some(Time),
            (Duration, Duration) => Some(Duration),
            _ => Option::None,
        },
        BinaryOperator::Multiplication => match (left, right) {
            (Number, Number) => Some(Number),
            (Duration, Number) | (Number, Duration) => Some(Duration),
            _ => Option::None,
        },
        BinaryOperator::Division => match (left, right) {
            (Number, Number) => Some(Number),
            (Duration, Number) => Some(Duration),
            (Duration, Duration) => Some(Number),
            _ => Option::None,
        },
        BinaryOperator::Concatenation => match (left, right) {
            (Text, Text) => Some(Text),
            (List, List) => Some(List),
            (Record, Record) => Some(Record),
            (Table, Table) => Some(Table),
            (Date, Time) => Some(DateTime),
            _ => Option::None,
        },
        _ => Option::None,
    }
}

/// The type of an arithmetic expression.
fn arithmetic_type(operator: BinaryOperator, left: Type, right: Type) -> Type {
    let (l, r) = (left.kind(), right.kind());
    if l == TypeKind::Unknown || r == TypeKind::Unknown {
        return Type::unknown();
    }

    if l == TypeKind::Any || r == TypeKind::Any {
        return Type::any();
    }

    if l == TypeKind::None || r == TypeKind::None {
        return Type::none_type();
    }

    // Concatenating two defined records or lists merges their
    // structure.
    if operator == BinaryOperator::Concatenation {
        if let (
            TypeVariant::DefinedRecord {
                fields: left_fields,
                is_open: left_open,
            },
            TypeVariant::DefinedRecord {
                fields: right_fields,
                is_open: right_open,
            },
        ) = (left.variant(), right.variant())
        {
            let mut fields = left_fields.clone();
            for (key, value) in right_fields {
                fields.insert(key.clone(), value.clone());
            }
            return Type::new(TypeVariant::DefinedRecord {
                fields,
                is_open: *left_open || *right_open,
            });
        }

        if let (TypeVariant::DefinedList(left_items), TypeVariant::DefinedList(right_items)) =
            (left.variant(), right.variant())
        {
            let mut items = left_items.clone();
            items.extend(right_items.iter().cloned());
            return Type::new(TypeVariant::DefinedList(items));
        }
    }

    let nullable = left.is_nullable() || right.is_nullable() || l == TypeKind::Null
        || r == TypeKind::Null;
    let effective = |k: TypeKind| if k == TypeKind::Null { TypeKind::Number } else { k };

    match arithmetic_kind(effective(l), operator, effective(r)) {
        Some(kind) => {
            let ty = Type::primitive(kind);
            if nullable { ty.nullable() } else { ty }
        }
        None => Type::none_type(),
    }
}
