use oxigraph::model::NamedNodeRef;

pub struct SHACL {
    pub node_shape: NamedNodeRef<'static>,
    pub target_class: NamedNodeRef<'static>,
    pub property: NamedNodeRef<'static>,
    pub path: NamedNodeRef<'static>,
    pub name: NamedNodeRef<'static>,
    pub description: NamedNodeRef<'static>,
    pub class: NamedNodeRef<'static>,
    pub datatype: NamedNodeRef<'static>,
    pub min_count: NamedNodeRef<'static>,
    pub max_count: NamedNodeRef<'static>,
    pub alternative_path: NamedNodeRef<'static>,
    pub inverse_path: NamedNodeRef<'static>,
    pub zero_or_more_path: NamedNodeRef<'static>,
    pub one_or_more_path: NamedNodeRef<'static>,
    pub zero_or_one_path: NamedNodeRef<'static>,
}

impl SHACL {
    pub fn new() -> Self {
        SHACL {
            node_shape: NamedNodeRef::new("http://www.w3.org/ns/shacl#NodeShape").unwrap(),
            target_class: NamedNodeRef::new("http://www.w3.org/ns/shacl#targetClass").unwrap(),
            property: NamedNodeRef::new("http://www.w3.org/ns/shacl#property").unwrap(),
            path: NamedNodeRef::new("http://www.w3.org/ns/shacl#path").unwrap(),
            name: NamedNodeRef::new("http://www.w3.org/ns/shacl#name").unwrap(),
            description: NamedNodeRef::new("http://www.w3.org/ns/shacl#description").unwrap(),
            class: NamedNodeRef::new("http://www.w3.org/ns/shacl#class").unwrap(),
            datatype: NamedNodeRef::new("http://www.w3.org/ns/shacl#datatype").unwrap(),
            min_count: NamedNodeRef::new("http://www.w3.org/ns/shacl#minCount").unwrap(),
            max_count: NamedNodeRef::new("http://www.w3.org/ns/shacl#maxCount").unwrap(),
            alternative_path: NamedNodeRef::new("http://www.w3.org/ns/shacl#alternativePath")
                .unwrap(),
            inverse_path: NamedNodeRef::new("http://www.w3.org/ns/shacl#inversePath").unwrap(),
            zero_or_more_path: NamedNodeRef::new("http://www.w3.org/ns/shacl#zeroOrMorePath")
                .unwrap(),
            one_or_more_path: NamedNodeRef::new("http://www.w3.org/ns/shacl#oneOrMorePath")
                .unwrap(),
            zero_or_one_path: NamedNodeRef::new("http://www.w3.org/ns/shacl#zeroOrOnePath")
                .unwrap(),
        }
    }
}

pub struct RDF {
    pub type_: NamedNodeRef<'static>,
    pub first: NamedNodeRef<'static>,
    pub rest: NamedNodeRef<'static>,
    pub nil: NamedNodeRef<'static>,
}

impl RDF {
    pub fn new() -> Self {
        RDF {
            type_: NamedNodeRef::new("http://www.w3.org/1999/02/22-rdf-syntax-ns#type").unwrap(),
            first: NamedNodeRef::new("http://www.w3.org/1999/02/22-rdf-syntax-ns#first").unwrap(),
            rest: NamedNodeRef::new("http://www.w3.org/1999/02/22-rdf-syntax-ns#rest").unwrap(),
            nil: NamedNodeRef::new("http://www.w3.org/1999/02/22-rdf-syntax-ns#nil").unwrap(),
        }
    }
}

pub struct RDFS {
    pub sub_class_of: NamedNodeRef<'static>,
    pub class: NamedNodeRef<'static>,
}

impl RDFS {
    pub fn new() -> Self {
        RDFS {
            sub_class_of: NamedNodeRef::new("http://www.w3.org/2000/01/rdf-schema#subClassOf")
                .unwrap(),
            class: NamedNodeRef::new("http://www.w3.org/2000/01/rdf-schema#Class").unwrap(),
        }
    }
}

/// The RDF-Lens ontology: built-in pseudo-classes and environment-variable terms.
pub struct RDFL {
    pub cbd: NamedNodeRef<'static>,
    pub path_lens: NamedNodeRef<'static>,
    pub context: NamedNodeRef<'static>,
    pub typed_extract: NamedNodeRef<'static>,
    pub env_variable: NamedNodeRef<'static>,
    pub env_key: NamedNodeRef<'static>,
    pub env_default: NamedNodeRef<'static>,
    pub datatype: NamedNodeRef<'static>,
}

impl RDFL {
    pub fn new() -> Self {
        RDFL {
            cbd: NamedNodeRef::new("https://w3id.org/rdf-lens/ontology#CBD").unwrap(),
            path_lens: NamedNodeRef::new("https://w3id.org/rdf-lens/ontology#PathLens").unwrap(),
            context: NamedNodeRef::new("https://w3id.org/rdf-lens/ontology#Context").unwrap(),
            typed_extract: NamedNodeRef::new("https://w3id.org/rdf-lens/ontology#TypedExtract")
                .unwrap(),
            env_variable: NamedNodeRef::new("https://w3id.org/rdf-lens/ontology#EnvVariable")
                .unwrap(),
            env_key: NamedNodeRef::new("https://w3id.org/rdf-lens/ontology#envKey").unwrap(),
            env_default: NamedNodeRef::new("https://w3id.org/rdf-lens/ontology#envDefault")
                .unwrap(),
            datatype: NamedNodeRef::new("https://w3id.org/rdf-lens/ontology#datatype").unwrap(),
        }
    }
}
